//! # CLI Configuration
//!
//! Calculation conventions and reference data location.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`COMEX_*`, e.g. `COMEX_ICMS_MODE=gross_up`)
//! 2. Config file (`comex.toml`, or the path given with `--config`)
//! 3. Defaults (this file)
//!
//! ## Configuration File Format
//! ```toml
//! # comex.toml
//! icms_mode = "gross_up"                   # simple | gross_up
//! ipi_base = "customs_value_plus_import_tax" # customs_value | customs_value_plus_import_tax
//! nationalization = true
//! rate_table_path = "/etc/comex/rates.json"  # optional, built-in table otherwise
//! output = "text"                          # json | text
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after loading.

use std::fs;
use std::path::{Path, PathBuf};

use comex_core::{CalculationModes, IcmsMode, IpiBase, RateTable};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

/// Default config file, looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "comex.toml";

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Report envelope as pretty JSON.
    #[default]
    Json,
    /// Aligned line items for a terminal.
    Text,
}

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComexConfig {
    /// ICMS formula
    pub icms_mode: IcmsMode,

    /// Base the IPI rate applies to
    pub ipi_base: IpiBase,

    /// Add AFRMM and other nationalization costs
    pub nationalization: bool,

    /// Replacement rate table (JSON); the built-in table when absent
    pub rate_table_path: Option<PathBuf>,

    /// Output format when `--format` is not given
    pub output: OutputFormat,
}

impl ComexConfig {
    /// Loads configuration from the optional file and `COMEX_*` variables.
    ///
    /// An explicitly named file must exist; the default `comex.toml` may not.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: ComexConfig = config::Config::builder()
            .set_default("icms_mode", "simple")?
            .set_default("ipi_base", "customs_value")?
            .set_default("nationalization", false)?
            .set_default("output", "json")?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("COMEX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Calculation conventions selected by this configuration.
    pub fn modes(&self) -> CalculationModes {
        CalculationModes {
            icms: self.icms_mode,
            ipi_base: self.ipi_base,
            nationalization: self.nationalization,
        }
    }

    /// Loads the rate table once for the whole run.
    pub fn load_rate_table(&self) -> CliResult<RateTable> {
        let table = match &self.rate_table_path {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), "Loading rate table");
                RateTable::from_json(&json)?
            }
            None => RateTable::builtin()?,
        };

        info!(
            classifications = table.classifications().count(),
            states = table.states().len(),
            "Rate table ready"
        );
        Ok(table)
    }
}
