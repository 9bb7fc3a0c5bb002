//! # Comex CLI
//!
//! Landed-cost calculator for goods imported into Brazil.
//!
//! ## Commands
//! ```text
//! comex calculate request.json        # JSON report envelope
//! comex calculate - --format text     # request from stdin, text report
//! comex calculate req.json --preset nationalized
//! comex ncm                           # classifications with their rates
//! comex states                        # state ICMS table
//! ```
//!
//! ## Exit Codes
//! - `0`: report written
//! - `2`: calculation rejected (rejection body written to stdout)
//! - `1`: anything else (config, I/O, malformed JSON)
//!
//! Logs go to stderr so stdout stays machine-readable. Override the level
//! with `RUST_LOG`.

mod error;
mod settings;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use comex_core::{
    CalculationModes, CalculationRequest, CostBreakdown, RateTable, ReportLine, TaxEngine,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use error::{CliError, CliResult, Rejection};
use settings::{ComexConfig, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "comex", version, about = "Brazilian import landed-cost calculator")]
struct Cli {
    /// Config file (defaults to ./comex.toml when present)
    #[arg(long, global = true, env = "COMEX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the landed cost of one shipment
    Calculate {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,

        /// Output format (overrides config)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Calculation conventions (overrides config)
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },

    /// List supported NCM classifications
    Ncm,

    /// List state ICMS rates
    States,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Tax-on-top ICMS, IPI on customs value
    Simple,
    /// Gross-up ICMS, IPI on customs value + II, AFRMM and other costs
    Nationalized,
}

impl From<Preset> for CalculationModes {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Simple => CalculationModes::simple(),
            Preset::Nationalized => CalculationModes::nationalized(),
        }
    }
}

/// Report envelope written by `calculate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    report_id: Uuid,
    generated_at: DateTime<Utc>,
    breakdown: CostBreakdown,
    lines: Vec<ReportLine>,
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let config = ComexConfig::load(cli.config.as_deref())?;
    let table = config.load_rate_table()?;

    match cli.command {
        Command::Calculate {
            request,
            format,
            preset,
        } => {
            let modes = preset.map(CalculationModes::from).unwrap_or_else(|| config.modes());
            let format = format.unwrap_or(config.output);

            match calculate(&table, modes, &request) {
                Ok(report) => {
                    print_report(&report, format)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(CliError::Rejected(err)) => {
                    warn!(reason = ?err.reason(), "Calculation rejected: {}", err);
                    println!("{}", serde_json::to_string_pretty(&Rejection::from(&err))?);
                    Ok(ExitCode::from(2))
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::Ncm => {
            print_classifications(&table);
            Ok(ExitCode::SUCCESS)
        }
        Command::States => {
            print_states(&table);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - ERROR: run aborted
/// - WARN: calculation rejected
/// - INFO: rate table loaded, report written
/// - DEBUG: resolved config, request details
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,comex=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_request(path: &Path) -> CliResult<String> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).map_err(io_error)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).map_err(io_error)
    }
}

/// Parses, coerces and calculates one request.
fn calculate(table: &RateTable, modes: CalculationModes, path: &Path) -> CliResult<Report> {
    let raw = read_request(path)?;
    let request: CalculationRequest = serde_json::from_str(&raw)?;
    debug!(?request, ?modes, "Calculating");

    let input = request.into_input().map_err(comex_core::ComexError::from)?;
    let breakdown = TaxEngine::new(table, modes).calculate(&input)?;

    let report = Report {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        lines: breakdown.report_lines(),
        breakdown,
    };

    info!(
        report_id = %report.report_id,
        ncm = %report.breakdown.classification_code,
        total_cost = report.breakdown.total_cost,
        "Report generated"
    );
    Ok(report)
}

fn print_report(report: &Report, format: OutputFormat) -> serde_json::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!(
                "NCM {}  x{}  (report {})",
                report.breakdown.classification_code, report.breakdown.quantity, report.report_id
            );
            for line in &report.lines {
                let rate = line
                    .rate
                    .map(|rate| format!("{:>7.2}%", rate.percentage()))
                    .unwrap_or_default();
                println!("{:<32}{:>8}{:>18}", line.label, rate, line.amount.to_string());
            }
        }
    }
    Ok(())
}

fn print_classifications(table: &RateTable) {
    println!(
        "{:<10}{:<40}{:>7}{:>7}{:>7}{:>8}{:>7}",
        "NCM", "Description", "II", "IPI", "PIS", "COFINS", "ICMS"
    );
    for classification in table.classifications() {
        let rates = &classification.rates;
        println!(
            "{:<10}{:<40}{:>6.2}%{:>6.2}%{:>6.2}%{:>7.2}%{:>7}",
            classification.ncm,
            classification.description,
            rates.import_tax_rate.percentage(),
            rates.ipi_rate.percentage(),
            rates.pis_rate.percentage(),
            rates.cofins_rate.percentage(),
            rates
                .icms_rate
                .map(|rate| format!("{:.2}%", rate.percentage()))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

fn print_states(table: &RateTable) {
    for state in table.states() {
        let rate = state
            .icms_rate
            .map(|rate| format!("{:.2}%", rate.percentage()))
            .unwrap_or_else(|| "caller-supplied".to_string());
        println!("{:<8}{:<24}{}", state.code, state.name, rate);
    }
}
