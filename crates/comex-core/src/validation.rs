//! # Validation Module
//!
//! Input validation utilities for Comex.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request coercion (request.rs)                                │
//! │  ├── Missing fields, non-numeric strings                               │
//! │  └── → ValidationError (InvalidInput)                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Non-negative, finite amounts       → InvalidInput                 │
//! │  ├── NCM format (8 digits)              → InvalidInput                 │
//! │  └── Rates in range (ICMS < 1, FX > 0)  → InvalidRate                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Reference data lookup (rates.rs)                             │
//! │  └── Unknown NCM / state                → NotFound                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comex_core::validation::{normalize_ncm, validate_icms_rate};
//!
//! assert_eq!(normalize_ncm("8517.12.31").unwrap(), "85171231");
//! assert!(validate_icms_rate("icms_rate", 0.18).is_ok());
//! assert!(validate_icms_rate("icms_rate", 1.0).is_err());
//! ```

use crate::error::{ComexError, ComexResult, ValidationError};
use crate::types::{InsuranceInput, Rate, RateSet, ShipmentInput};
use crate::NCM_DIGITS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Classification Code
// =============================================================================

/// Normalizes an NCM code to its 8-digit form.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Dots are separators only (`8517.12.31` == `85171231`)
/// - Exactly 8 ASCII digits must remain
pub fn normalize_ncm(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "classification_code".to_string(),
        });
    }

    let digits: String = code.chars().filter(|c| *c != '.').collect();

    if digits.len() != NCM_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "classification_code".to_string(),
            reason: format!("must be {} digits, e.g. 8517.12.31", NCM_DIGITS),
        });
    }

    Ok(digits)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a monetary amount or count.
///
/// ## Rules
/// - Must be finite
/// - Must be zero or positive
pub fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an ICMS rate.
///
/// ## Rules
/// - Must be in `[0, 1)`
/// - Exactly 1 is rejected: the gross-up divides by `1 - rate`
///
/// ## Example
/// ```rust
/// use comex_core::validation::validate_icms_rate;
///
/// assert!(validate_icms_rate("icms_rate", 0.0).is_ok());
/// assert!(validate_icms_rate("icms_rate", 0.999).is_ok());
/// assert!(validate_icms_rate("icms_rate", 1.0).is_err());
/// ```
pub fn validate_icms_rate(field: &str, value: f64) -> ComexResult<Rate> {
    let rate = Rate::new(field, value)?;

    if rate.fraction() >= 1.0 {
        return Err(ComexError::invalid_rate(field, value, "must be below 1"));
    }

    Ok(rate)
}

/// Validates a fractional rate that may be at most 1 (100%).
pub fn validate_fraction(field: &str, value: f64) -> ComexResult<Rate> {
    let rate = Rate::new(field, value)?;

    if rate.fraction() > 1.0 {
        return Err(ComexError::invalid_rate(field, value, "must not exceed 1"));
    }

    Ok(rate)
}

/// Validates every rate in a classification's rate set.
///
/// Duty rates must be in `[0, 1]`; the optional ICMS default in `[0, 1)`.
pub fn validate_rate_set(rates: &RateSet) -> ComexResult<()> {
    validate_fraction("import_tax_rate", rates.import_tax_rate.fraction())?;
    validate_fraction("ipi_rate", rates.ipi_rate.fraction())?;
    validate_fraction("pis_rate", rates.pis_rate.fraction())?;
    validate_fraction("cofins_rate", rates.cofins_rate.fraction())?;
    if let Some(icms) = rates.icms_rate {
        validate_icms_rate("icms_rate", icms.fraction())?;
    }

    Ok(())
}

/// Validates a BRL-per-unit exchange rate.
///
/// ## Rules
/// - Must be finite and strictly positive
pub fn validate_exchange_rate(value: f64) -> ComexResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ComexError::invalid_rate(
            "exchange_rate",
            value,
            "must be a positive number",
        ));
    }

    Ok(())
}

// =============================================================================
// Shipment Validator
// =============================================================================

/// Validates every numeric field of a shipment before any tax is computed.
///
/// A quantity of zero is accepted: the breakdown is still defined and its
/// cost per unit is zero.
pub fn validate_shipment(input: &ShipmentInput) -> ComexResult<()> {
    validate_non_negative("quantity", input.quantity)?;
    validate_non_negative("unit_cost", input.unit_cost)?;
    validate_non_negative("freight", input.freight)?;

    match input.insurance {
        InsuranceInput::Amount(amount) => validate_non_negative("insurance", amount)?,
        InsuranceInput::Rate(rate) => {
            validate_fraction("insurance_rate", rate)?;
        }
    }

    validate_exchange_rate(input.currency.exchange_rate())?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
