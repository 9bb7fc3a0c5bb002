//! # comex-core: Pure Import Tax Logic for Comex
//!
//! This crate computes the landed cost of a shipment imported into Brazil.
//! Every function is pure: no I/O, no global state, no logging.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comex Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Caller (comex-cli, or an HTTP request layer)          │   │
//! │  │    parse request ──► load RateTable once ──► render report      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CalculationRequest / ShipmentInput     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ comex-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  request  │  │   rates   │  │  engine   │  │  report   │  │   │
//! │  │   │ coercion  │─►│ NCM/state │─►│ II IPI    │─►│ line items│  │   │
//! │  │   │           │  │  lookups  │  │ PIS COFINS│  │   Money   │  │   │
//! │  │   │           │  │           │  │ ICMS      │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO GLOBAL STATE • PURE FUNCTIONS                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Rates, shipment input, calculation modes, cost breakdown
//! - [`rates`] - Static NCM and state ICMS reference tables
//! - [`engine`] - The formula chain and [`TaxEngine`]
//! - [`request`] - Raw request coercion
//! - [`report`] - Centavo-rounded report line items
//! - [`money`] - Integer centavo amounts
//! - [`error`] - Domain error types
//! - [`validation`] - Input and rate range checks
//!
//! ## Example Usage
//!
//! ```rust
//! use comex_core::{CalculationModes, IcmsSelection, InsuranceInput, RateTable, ShipmentInput,
//!                  TaxEngine, Currency};
//!
//! let table = RateTable::builtin().unwrap();
//! let engine = TaxEngine::new(&table, CalculationModes::simple());
//!
//! let breakdown = engine
//!     .calculate(&ShipmentInput {
//!         classification_code: "8517.12.31".to_string(),
//!         quantity: 10.0,
//!         unit_cost: 100.0,
//!         freight: 50.0,
//!         insurance: InsuranceInput::Amount(20.0),
//!         currency: Currency::Brl,
//!         icms: IcmsSelection::State("SP".to_string()),
//!     })
//!     .unwrap();
//!
//! assert_eq!(breakdown.customs_value, 1070.0);
//! assert!((breakdown.total_cost - 1695.0405).abs() < 1e-6);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod money;
pub mod rates;
pub mod report;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use engine::{compute_breakdown, TaxEngine};
pub use error::{ComexError, ComexResult, RateTableError, RejectionReason, ValidationError};
pub use money::Money;
pub use rates::{Classification, RateTable, StateIcms};
pub use report::{LineKind, ReportLine};
pub use request::{CalculationRequest, NumericField, TextField};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Digits in an NCM code.
pub const NCM_DIGITS: usize = 8;

/// State table entry whose ICMS rate is supplied by the caller.
pub const CUSTOM_STATE: &str = "Custom";

/// AFRMM as a fraction of freight.
///
/// ## Business Reason
/// The merchant-marine renewal surcharge is 25% of ocean freight on
/// long-haul routes.
pub const AFRMM_FREIGHT_RATE: f64 = 0.25;

/// Port, broker and storage allowance as a fraction of product cost.
pub const OTHER_COSTS_RATE: f64 = 0.10;
