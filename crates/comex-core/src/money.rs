//! # Money Module
//!
//! Provides the `Money` type used when a breakdown is projected into report
//! line items.
//!
//! ## Two Representations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ENGINE (f64 reais)                 REPORT (i64 centavos)               │
//! │                                                                         │
//! │  PIS = 1070 × 0.0165 = 17.655  ──►  Money::from_reais(17.655)          │
//! │                                          = 1766 centavos (R$ 17,66)    │
//! │                                                                         │
//! │  The formula chain keeps full precision so that later taxes are not    │
//! │  computed on already-rounded values. Rounding happens exactly once,    │
//! │  at the report boundary.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comex_core::money::Money;
//!
//! let pis = Money::from_reais(17.655);
//! assert_eq!(pis.centavos(), 1766);
//! assert_eq!(pis.to_string(), "R$ 17,66");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 BRL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_centavos(centavos: i64) -> Self {
        Money(centavos)
    }

    /// Rounds a full-precision real amount to the nearest centavo.
    ///
    /// Halves round away from zero (`f64::round`), which is how Brazilian
    /// customs documents present computed duties.
    ///
    /// ## Example
    /// ```rust
    /// use comex_core::money::Money;
    ///
    /// assert_eq!(Money::from_reais(160.5).centavos(), 16050);
    /// assert_eq!(Money::from_reais(259.9515).centavos(), 25995);
    /// assert_eq!(Money::from_reais(0.005).centavos(), 1);
    /// ```
    pub fn from_reais(reais: f64) -> Self {
        // Products like 1070 × 0.0165 can land a few ulps under an exact
        // half centavo; nudge away from zero before rounding.
        let scaled = reais * 100.0;
        let nudged = scaled + scaled * 1e-12;
        Money(nudged.round() as i64)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn centavos(&self) -> i64 {
        self.0
    }

    /// Returns the whole-real portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavo portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Brazilian real formatting: `R$ 1.696,43`.
///
/// ## Note
/// Thousands are grouped with `.` and the decimal separator is `,`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.reais().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.centavos_part())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
