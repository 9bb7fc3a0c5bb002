//! # Error Types
//!
//! Domain-specific error types for comex-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comex-core errors (this file)                                         │
//! │  ├── ComexError       - Rejections surfaced to the caller              │
//! │  │   ├── ClassificationNotFound / StateNotFound  (NotFoundError)       │
//! │  │   ├── InvalidRate                              (InvalidRateError)    │
//! │  │   └── InvalidInput(ValidationError)            (InvalidInputError)   │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  comex-cli errors (app)                                                │
//! │  └── CliError         - Config / I/O failures around the engine        │
//! │                                                                         │
//! │  Flow: ValidationError → ComexError → RejectionReason → status code    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (NCM, state, field name)
//! 3. No rejection is ever recovered by substituting a default rate
//! 4. Each variant maps to exactly one [`RejectionReason`]

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Comex Error
// =============================================================================

/// Errors raised while resolving rates or computing a breakdown.
///
/// All of these are local, synchronous validation failures. None of them is
/// transient, so callers must not retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComexError {
    /// The NCM classification code is absent from the rate table.
    ///
    /// ## When This Occurs
    /// - Well-formed 8-digit code that the table does not carry (`00000000`)
    /// - Code removed from a replacement rate table
    #[error("Classification not found: {0}")]
    ClassificationNotFound(String),

    /// The destination state is absent from the state ICMS table.
    #[error("State not found: {0}")]
    StateNotFound(String),

    /// A rate is outside its valid range.
    ///
    /// ## When This Occurs
    /// - ICMS rate ≥ 1 (the gross-up denominator would be zero or negative)
    /// - Negative or non-finite rate anywhere
    /// - Exchange rate ≤ 0
    #[error("Invalid rate for {field} ({value}): {reason}")]
    InvalidRate {
        field: String,
        value: f64,
        reason: String,
    },

    /// Shipment input is missing, non-numeric or negative.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
}

impl ComexError {
    /// Shorthand for an [`ComexError::InvalidRate`].
    pub fn invalid_rate(field: &str, value: f64, reason: impl Into<String>) -> Self {
        ComexError::InvalidRate {
            field: field.to_string(),
            value,
            reason: reason.into(),
        }
    }

    /// Returns the distinguishing reason a caller uses to pick a message.
    pub fn reason(&self) -> RejectionReason {
        match self {
            ComexError::ClassificationNotFound(_) => RejectionReason::UnknownClassification,
            ComexError::StateNotFound(_) => RejectionReason::UnknownState,
            ComexError::InvalidRate { .. } => RejectionReason::InvalidRate,
            ComexError::InvalidInput(_) => RejectionReason::InvalidInput,
        }
    }

    /// True for both lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ComexError::ClassificationNotFound(_) | ComexError::StateNotFound(_)
        )
    }
}

// =============================================================================
// Rejection Reason
// =============================================================================

/// Machine-readable rejection category.
///
/// ## Serialization
/// ```json
/// { "reason": "UNKNOWN_CLASSIFICATION" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// NCM code not in the rate table (404)
    UnknownClassification,
    /// State not in the ICMS table (404)
    UnknownState,
    /// Missing / non-numeric / negative field (400)
    InvalidInput,
    /// Rate out of range (422)
    InvalidRate,
}

impl RejectionReason {
    /// HTTP-style status code for request-layer callers.
    pub const fn status_code(&self) -> u16 {
        match self {
            RejectionReason::UnknownClassification | RejectionReason::UnknownState => 404,
            RejectionReason::InvalidInput => 400,
            RejectionReason::InvalidRate => 422,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level input validation errors.
///
/// Raised while coercing a raw request or checking a [`crate::ShipmentInput`]
/// before any tax is computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// The value could not be read as a number.
    #[error("{field} must be a number, got '{value}'")]
    NotANumber { field: String, value: String },

    /// NaN or infinity.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed NCM code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Rate Table Error
// =============================================================================

/// Errors raised while loading reference data.
///
/// These happen once at startup, never per request.
#[derive(Debug, Error)]
pub enum RateTableError {
    /// The document is not valid JSON or does not match the table layout.
    #[error("Rate table is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry carries an unusable code or rate.
    #[error("Rate table entry {entry} is invalid: {reason}")]
    InvalidEntry { entry: String, reason: String },

    /// The same NCM or state appears twice.
    #[error("Rate table entry {0} is duplicated")]
    Duplicate(String),

    /// The state table needs exactly one caller-supplied (`Custom`) entry.
    #[error("State table must contain exactly one Custom entry, found {0}")]
    CustomEntryCount(usize),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with ComexError.
pub type ComexResult<T> = Result<T, ComexError>;

// =============================================================================
// Unit Tests
// =============================================================================
