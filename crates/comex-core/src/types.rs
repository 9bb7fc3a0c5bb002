//! # Domain Types
//!
//! Core domain types used throughout Comex.
//!
//! ## Type Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    RateSet      │   │  ShipmentInput  │   │  CostBreakdown  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  import_tax     │   │  ncm, quantity  │   │  customs_value  │       │
//! │  │  ipi            │──►│  unit_cost      │──►│  II IPI PIS     │       │
//! │  │  pis / cofins   │   │  insurance      │   │  COFINS ICMS    │       │
//! │  │  icms (opt)     │   │  currency       │   │  total_cost     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Rate: fraction (0.18 = 18%)                                           │
//! │  Currency: Brl | Usd { exchange_rate }                                  │
//! │  InsuranceInput: Amount | Rate                                          │
//! │  IcmsSelection: State | Custom | Classification                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ComexError, ComexResult};

// =============================================================================
// Rate
// =============================================================================

/// A tax rate expressed as a fraction: `0.18` is 18%.
///
/// ## Why a Fraction?
/// The duty tables publish percentages with up to four decimal places
/// (PIS 1.65%, COFINS 7.6%, custom ICMS overrides like 17.5%),
/// and the ICMS gross-up needs `1 - rate` as a divisor. A fraction keeps both
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(f64);

impl Rate {
    /// Creates a rate from a fraction without range checks.
    ///
    /// Prefer [`Rate::new`] for anything that came from a caller.
    #[inline]
    pub const fn from_fraction(fraction: f64) -> Self {
        Rate(fraction)
    }

    /// Creates a rate from a caller-supplied fraction.
    ///
    /// ## Rules
    /// - Must be finite
    /// - Must not be negative
    ///
    /// ## Example
    /// ```rust
    /// use comex_core::types::Rate;
    ///
    /// assert!(Rate::new("icms_rate", 0.18).is_ok());
    /// assert!(Rate::new("icms_rate", -0.01).is_err());
    /// assert!(Rate::new("icms_rate", f64::NAN).is_err());
    /// ```
    pub fn new(field: &str, fraction: f64) -> ComexResult<Self> {
        if !fraction.is_finite() {
            return Err(ComexError::invalid_rate(field, fraction, "must be a finite number"));
        }
        if fraction < 0.0 {
            return Err(ComexError::invalid_rate(field, fraction, "must not be negative"));
        }
        Ok(Rate(fraction))
    }

    /// Returns the rate as a fraction.
    #[inline]
    pub const fn fraction(&self) -> f64 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 * 100.0
    }

    /// Applies the rate to an amount.
    #[inline]
    pub fn of(&self, amount: f64) -> f64 {
        amount * self.0
    }
}

// =============================================================================
// Rate Set
// =============================================================================

/// Duty rates for one NCM classification.
///
/// `icms_rate` is optional: ICMS normally depends on the destination state,
/// and only some classifications carry a default of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RateSet {
    /// II - Imposto de Importação.
    pub import_tax_rate: Rate,
    /// IPI - Imposto sobre Produtos Industrializados.
    pub ipi_rate: Rate,
    /// Classification default ICMS, used when no state is given.
    #[serde(default)]
    pub icms_rate: Option<Rate>,
    /// PIS-Importação.
    pub pis_rate: Rate,
    /// COFINS-Importação.
    pub cofins_rate: Rate,
}

// =============================================================================
// Shipment Input
// =============================================================================

/// Currency the shipment amounts are quoted in.
///
/// Output is always BRL; USD amounts are multiplied by the client-supplied
/// exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Brazilian real (exchange rate 1).
    Brl,
    /// US dollar with the BRL-per-USD rate to apply.
    Usd {
        #[serde(rename = "exchangeRate")]
        exchange_rate: f64,
    },
}

impl Currency {
    /// BRL per unit of this currency.
    pub fn exchange_rate(&self) -> f64 {
        match self {
            Currency::Brl => 1.0,
            Currency::Usd { exchange_rate } => *exchange_rate,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Brl
    }
}

/// How insurance was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceInput {
    /// Absolute amount in the input currency.
    Amount(f64),
    /// Fraction applied to the BRL product cost (`0.01` = 1%).
    Rate(f64),
}

impl Default for InsuranceInput {
    fn default() -> Self {
        InsuranceInput::Amount(0.0)
    }
}

/// Where the ICMS rate comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IcmsSelection {
    /// Destination state, looked up in the state ICMS table.
    State(String),
    /// Caller-supplied override (the table's `Custom` entry).
    Custom(f64),
    /// The classification's own default ICMS rate.
    Classification,
}

/// A fully parsed shipment, ready for the engine.
///
/// ## User Workflow
/// ```text
/// Raw request (JSON, strings or numbers)
///      │
///      ▼
/// CalculationRequest::into_input()  ← coercion, InvalidInput on failure
///      │
///      ▼
/// ShipmentInput  ← THIS TYPE
///      │
///      ▼
/// TaxEngine::calculate()
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentInput {
    /// NCM code, 8 digits (dots allowed).
    pub classification_code: String,
    /// Number of units shipped.
    pub quantity: f64,
    /// Cost per unit in the input currency.
    pub unit_cost: f64,
    /// International freight in the input currency.
    pub freight: f64,
    pub insurance: InsuranceInput,
    #[serde(default)]
    pub currency: Currency,
    pub icms: IcmsSelection,
}

// =============================================================================
// Calculation Modes
// =============================================================================

/// ICMS formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IcmsMode {
    /// Tax on top: `base × rate`.
    Simple,
    /// Tax included in its own base: `rate × base / (1 - rate)`.
    GrossUp,
}

impl Default for IcmsMode {
    fn default() -> Self {
        IcmsMode::Simple
    }
}

/// Base the IPI rate is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IpiBase {
    /// Customs value (CIF) only.
    CustomsValue,
    /// Customs value plus the import tax.
    CustomsValuePlusImportTax,
}

impl Default for IpiBase {
    fn default() -> Self {
        IpiBase::CustomsValue
    }
}

/// Formula conventions for one calculation.
///
/// The two tax-base conventions have both been used in practice, so callers
/// pick one explicitly instead of the engine guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculationModes {
    pub icms: IcmsMode,
    pub ipi_base: IpiBase,
    /// Add AFRMM and other post-clearance costs.
    pub nationalization: bool,
}

impl CalculationModes {
    /// Tax-on-top ICMS, IPI on customs value, no nationalization costs.
    pub const fn simple() -> Self {
        CalculationModes {
            icms: IcmsMode::Simple,
            ipi_base: IpiBase::CustomsValue,
            nationalization: false,
        }
    }

    /// Gross-up ICMS, IPI on customs value plus II, nationalization costs.
    pub const fn nationalized() -> Self {
        CalculationModes {
            icms: IcmsMode::GrossUp,
            ipi_base: IpiBase::CustomsValuePlusImportTax,
            nationalization: true,
        }
    }
}

// =============================================================================
// Cost Breakdown
// =============================================================================

/// Rates actually applied to a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRates {
    pub import_tax_rate: Rate,
    pub ipi_rate: Rate,
    pub pis_rate: Rate,
    pub cofins_rate: Rate,
    pub icms_rate: Rate,
    pub exchange_rate: f64,
}

/// Itemized landed cost of a shipment, all amounts in BRL.
///
/// Amounts keep full precision; use [`CostBreakdown::report_lines`] for
/// centavo-rounded line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub classification_code: String,
    pub quantity: f64,

    pub product_cost: f64,
    pub freight: f64,
    pub insurance: f64,
    /// CIF: product cost + freight + insurance.
    pub customs_value: f64,

    /// II.
    pub import_tax: f64,
    /// Amount the IPI rate was applied to (depends on [`IpiBase`]).
    pub ipi_base: f64,
    pub ipi: f64,
    pub pis: f64,
    pub cofins: f64,
    /// Amount the ICMS formula was applied to, before any gross-up.
    pub icms_base: f64,
    pub icms: f64,
    /// II + IPI + PIS + COFINS + ICMS.
    pub total_taxes: f64,

    /// Merchant-marine freight surcharge, 0 unless nationalization is modeled.
    pub afrmm: f64,
    /// Port, broker and storage allowance, 0 unless nationalization is modeled.
    pub other_costs: f64,

    pub total_cost: f64,
    pub cost_per_unit: f64,
    /// total_taxes / customs_value.
    pub effective_tax_rate: f64,

    pub rates: AppliedRates,
    pub modes: CalculationModes,
}

// =============================================================================
// Unit Tests
// =============================================================================
