//! # CLI Error Types
//!
//! Two layers:
//!
//! - [`CliError`]: anything that stops a run (config, I/O, rate table,
//!   malformed JSON, rejected calculation).
//! - [`Rejection`]: the serializable body written when the engine rejects a
//!   request, so scripted callers get the same shape an HTTP layer would.
//!
//! ```json
//! {
//!   "reason": "UNKNOWN_STATE",
//!   "statusCode": 404,
//!   "message": "State not found: XX"
//! }
//! ```

use std::path::PathBuf;

use comex_core::{ComexError, RateTableError, RejectionReason};
use serde::Serialize;
use thiserror::Error;

/// Errors that end a CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rate table error: {0}")]
    RateTable(#[from] RateTableError),

    #[error("Malformed request: {0}")]
    Request(#[from] serde_json::Error),

    #[error("Calculation rejected: {0}")]
    Rejected(#[from] ComexError),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Rejection body written to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// Machine-readable category
    pub reason: RejectionReason,

    /// HTTP-style status (400, 404, 422)
    pub status_code: u16,

    /// Human-readable message
    pub message: String,
}

impl From<&ComexError> for Rejection {
    fn from(err: &ComexError) -> Self {
        let reason = err.reason();
        Rejection {
            reason,
            status_code: reason.status_code(),
            message: err.to_string(),
        }
    }
}
