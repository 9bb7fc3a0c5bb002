//! # Tax Engine
//!
//! Applies Brazilian import duties to a shipment, in a fixed order.
//!
//! ## Formula Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. product_cost  = quantity × unit_cost × fx                          │
//! │  2. freight       = freight × fx                                       │
//! │     insurance     = amount × fx   |   rate × product_cost              │
//! │  3. customs_value = product_cost + freight + insurance      (CIF)      │
//! │  4. II            = customs_value × ii_rate                             │
//! │  5. IPI           = ipi_base × ipi_rate                                 │
//! │                     ipi_base = customs_value [+ II]                     │
//! │  6. PIS           = customs_value × pis_rate                            │
//! │     COFINS        = customs_value × cofins_rate                         │
//! │  7. icms_base     = customs_value + II + IPI + PIS + COFINS             │
//! │     ICMS simple   = icms_base × r                                       │
//! │     ICMS gross-up = r × icms_base / (1 − r)                             │
//! │  8. AFRMM         = 0.25 × freight         ┐ nationalization only      │
//! │     other_costs   = 0.10 × product_cost    ┘                            │
//! │  9. total_cost    = customs_value + taxes (+ AFRMM + other_costs)       │
//! │ 10. cost_per_unit = total_cost / quantity, or 0 when quantity = 0       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each step reads only results of earlier steps. Amounts are kept at full
//! precision; rounding to centavos happens in [`crate::report`].
//!
//! ## Why Gross-Up?
//! ICMS on imports is levied "por dentro": the tax is part of its own base.
//! Solving `ICMS = r × (base + ICMS)` for ICMS gives `r × base / (1 − r)`,
//! which is undefined at `r = 1`.

use crate::error::{ComexError, ComexResult, ValidationError};
use crate::rates::RateTable;
use crate::types::{
    AppliedRates, CalculationModes, CostBreakdown, IcmsMode, IcmsSelection, InsuranceInput,
    IpiBase, Rate, RateSet, ShipmentInput,
};
use crate::validation::{
    normalize_ncm, validate_icms_rate, validate_non_negative, validate_rate_set, validate_shipment,
};
use crate::{AFRMM_FREIGHT_RATE, CUSTOM_STATE, OTHER_COSTS_RATE};

// =============================================================================
// Pure Formula Pipeline
// =============================================================================

/// Computes an itemized breakdown from already-resolved rates.
///
/// ## Errors
/// - `InvalidInput` for negative or non-finite shipment fields, or amounts
///   that overflow to infinity
/// - `InvalidRate` for a duty rate outside `[0, 1]`, an ICMS rate outside
///   `[0, 1)` or a non-positive exchange rate
///
/// ## Example
/// ```rust
/// use comex_core::engine::compute_breakdown;
/// use comex_core::types::*;
///
/// let rates = RateSet {
///     import_tax_rate: Rate::from_fraction(0.15),
///     ipi_rate: Rate::from_fraction(0.10),
///     icms_rate: None,
///     pis_rate: Rate::from_fraction(0.0165),
///     cofins_rate: Rate::from_fraction(0.076),
/// };
/// let input = ShipmentInput {
///     classification_code: "85171231".to_string(),
///     quantity: 10.0,
///     unit_cost: 100.0,
///     freight: 50.0,
///     insurance: InsuranceInput::Amount(20.0),
///     currency: Currency::Brl,
///     icms: IcmsSelection::Classification,
/// };
///
/// let b = compute_breakdown(&input, &rates, Rate::from_fraction(0.18), CalculationModes::simple())
///     .unwrap();
/// assert_eq!(b.customs_value, 1070.0);
/// assert!((b.icms - 258.5655).abs() < 1e-9);
/// ```
pub fn compute_breakdown(
    input: &ShipmentInput,
    rates: &RateSet,
    icms_rate: Rate,
    modes: CalculationModes,
) -> ComexResult<CostBreakdown> {
    validate_shipment(input)?;
    validate_rate_set(rates)?;
    let icms_rate = validate_icms_rate("icms_rate", icms_rate.fraction())?;

    let exchange_rate = input.currency.exchange_rate();

    // Steps 1-3: customs value in BRL
    let product_cost = input.quantity * input.unit_cost * exchange_rate;
    let freight = input.freight * exchange_rate;
    let insurance = match input.insurance {
        InsuranceInput::Amount(amount) => amount * exchange_rate,
        InsuranceInput::Rate(rate) => product_cost * rate,
    };
    let customs_value = product_cost + freight + insurance;

    // Steps 4-6: federal taxes
    let import_tax = rates.import_tax_rate.of(customs_value);
    let ipi_base = match modes.ipi_base {
        IpiBase::CustomsValue => customs_value,
        IpiBase::CustomsValuePlusImportTax => customs_value + import_tax,
    };
    let ipi = rates.ipi_rate.of(ipi_base);
    let pis = rates.pis_rate.of(customs_value);
    let cofins = rates.cofins_rate.of(customs_value);

    // Step 7: state tax
    let icms_base = customs_value + import_tax + ipi + pis + cofins;
    let icms = match modes.icms {
        IcmsMode::Simple => icms_rate.of(icms_base),
        IcmsMode::GrossUp => gross_up(icms_base, icms_rate),
    };

    let total_taxes = import_tax + ipi + pis + cofins + icms;

    // Step 8: nationalization
    let (afrmm, other_costs) = if modes.nationalization {
        (AFRMM_FREIGHT_RATE * freight, OTHER_COSTS_RATE * product_cost)
    } else {
        (0.0, 0.0)
    };

    // Steps 9-10
    let total_cost = customs_value + total_taxes + afrmm + other_costs;
    let cost_per_unit = if input.quantity > 0.0 {
        total_cost / input.quantity
    } else {
        0.0
    };
    let effective_tax_rate = if customs_value > 0.0 {
        total_taxes / customs_value
    } else {
        0.0
    };

    // Finite inputs can still overflow once multiplied together
    for (field, amount) in [
        ("product_cost", product_cost),
        ("customs_value", customs_value),
        ("icms", icms),
        ("total_cost", total_cost),
        ("cost_per_unit", cost_per_unit),
    ] {
        validate_non_negative(field, amount)?;
    }

    Ok(CostBreakdown {
        classification_code: normalize_ncm(&input.classification_code)?,
        quantity: input.quantity,
        product_cost,
        freight,
        insurance,
        customs_value,
        import_tax,
        ipi_base,
        ipi,
        pis,
        cofins,
        icms_base,
        icms,
        total_taxes,
        afrmm,
        other_costs,
        total_cost,
        cost_per_unit,
        effective_tax_rate,
        rates: AppliedRates {
            import_tax_rate: rates.import_tax_rate,
            ipi_rate: rates.ipi_rate,
            pis_rate: rates.pis_rate,
            cofins_rate: rates.cofins_rate,
            icms_rate,
            exchange_rate,
        },
        modes,
    })
}

/// ICMS "por dentro": `rate × base / (1 − rate)`.
///
/// Callers guarantee `rate < 1`.
fn gross_up(base: f64, rate: Rate) -> f64 {
    rate.of(base) / (1.0 - rate.fraction())
}

// =============================================================================
// Tax Engine
// =============================================================================

/// Resolves rates from the reference table and runs the formula chain.
///
/// Holds only a shared reference to the table and a copy of the modes, so an
/// engine is cheap to build per request and safe to share across threads.
///
/// ## User Workflow
/// ```text
/// ShipmentInput
///      │
///      ▼
/// calculate() ← THIS METHOD
///      │
///      ├── validate_shipment        → InvalidInput / InvalidRate
///      ├── resolve_rates(ncm)       → ClassificationNotFound
///      ├── resolve ICMS             → StateNotFound / InvalidRate
///      │
///      ▼
/// compute_breakdown → CostBreakdown
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    table: &'a RateTable,
    modes: CalculationModes,
}

impl<'a> TaxEngine<'a> {
    pub fn new(table: &'a RateTable, modes: CalculationModes) -> Self {
        TaxEngine { table, modes }
    }

    pub fn modes(&self) -> CalculationModes {
        self.modes
    }

    pub fn table(&self) -> &'a RateTable {
        self.table
    }

    /// Computes the full breakdown for a shipment.
    pub fn calculate(&self, input: &ShipmentInput) -> ComexResult<CostBreakdown> {
        validate_shipment(input)?;

        let rates = self.table.resolve_rates(&input.classification_code)?;
        let icms_rate = self.resolve_icms(&input.icms, &rates)?;

        compute_breakdown(input, &rates, icms_rate, self.modes)
    }

    /// Picks the ICMS rate for a selection.
    ///
    /// `Classification` falls back to the rate set's own default and is
    /// rejected when the classification has none, since ICMS then depends on
    /// a state the caller did not give.
    pub fn resolve_icms(&self, selection: &IcmsSelection, rates: &RateSet) -> ComexResult<Rate> {
        match selection {
            IcmsSelection::State(state) => self.table.resolve_icms_rate(state, None),
            IcmsSelection::Custom(rate) => self.table.resolve_icms_rate(CUSTOM_STATE, Some(*rate)),
            IcmsSelection::Classification => rates.icms_rate.ok_or_else(|| {
                ComexError::InvalidInput(ValidationError::Required {
                    field: "state".to_string(),
                })
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionReason;
    use crate::types::Currency;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn phone_rates() -> RateSet {
        RateSet {
            import_tax_rate: Rate::from_fraction(0.15),
            ipi_rate: Rate::from_fraction(0.10),
            icms_rate: Some(Rate::from_fraction(0.18)),
            pis_rate: Rate::from_fraction(0.0165),
            cofins_rate: Rate::from_fraction(0.076),
        }
    }

    fn phones(icms: IcmsSelection) -> ShipmentInput {
        ShipmentInput {
            classification_code: "85171231".to_string(),
            quantity: 10.0,
            unit_cost: 100.0,
            freight: 50.0,
            insurance: InsuranceInput::Amount(20.0),
            currency: Currency::Brl,
            icms,
        }
    }

    fn simple(input: &ShipmentInput) -> CostBreakdown {
        compute_breakdown(
            input,
            &phone_rates(),
            Rate::from_fraction(0.18),
            CalculationModes::simple(),
        )
        .unwrap()
    }

    #[test]
    fn test_mobile_phones_simple_mode() {
        let b = simple(&phones(IcmsSelection::Classification));

        assert_close(b.product_cost, 1000.0);
        assert_close(b.customs_value, 1070.0);
        assert_close(b.import_tax, 160.5);
        assert_close(b.ipi_base, 1070.0);
        assert_close(b.ipi, 107.0);
        assert_close(b.pis, 17.655);
        assert_close(b.cofins, 81.32);
        assert_close(b.icms_base, 1436.475);
        assert_close(b.icms, 1436.475 * 0.18);
        assert_close(b.total_taxes, 160.5 + 107.0 + 17.655 + 81.32 + 258.5655);
        assert_close(b.total_cost, 1070.0 + b.total_taxes);
        assert_close(b.total_cost, 1695.0405);
        assert_close(b.cost_per_unit, 169.50405);
        assert_eq!(b.afrmm, 0.0);
        assert_eq!(b.other_costs, 0.0);
    }

    #[test]
    fn test_gross_up_icms() {
        let modes = CalculationModes {
            icms: IcmsMode::GrossUp,
            ..CalculationModes::simple()
        };
        let b = compute_breakdown(
            &phones(IcmsSelection::Classification),
            &phone_rates(),
            Rate::from_fraction(0.18),
            modes,
        )
        .unwrap();

        assert_close(b.icms_base, 1436.475);
        assert_close(b.icms, 0.18 * 1436.475 / 0.82);
        assert_close(b.icms * (1.0 - 0.18), 0.18 * b.icms_base);
        assert_close(
            b.total_taxes,
            b.import_tax + b.ipi + b.pis + b.cofins + b.icms,
        );
    }

    #[test]
    fn test_ipi_base_plus_import_tax() {
        let modes = CalculationModes {
            ipi_base: IpiBase::CustomsValuePlusImportTax,
            ..CalculationModes::simple()
        };
        let b = compute_breakdown(
            &phones(IcmsSelection::Classification),
            &phone_rates(),
            Rate::from_fraction(0.18),
            modes,
        )
        .unwrap();

        assert_close(b.ipi_base, 1070.0 + 160.5);
        assert_close(b.ipi, 123.05);
    }

    #[test]
    fn test_nationalization_costs() {
        let b = compute_breakdown(
            &phones(IcmsSelection::Classification),
            &phone_rates(),
            Rate::from_fraction(0.18),
            CalculationModes::nationalized(),
        )
        .unwrap();

        assert_close(b.afrmm, 12.5);
        assert_close(b.other_costs, 100.0);
        assert_close(
            b.total_cost,
            b.customs_value + b.total_taxes + 12.5 + 100.0,
        );
    }

    #[test]
    fn test_usd_conversion() {
        let input = ShipmentInput {
            currency: Currency::Usd { exchange_rate: 5.0 },
            ..phones(IcmsSelection::Classification)
        };
        let b = simple(&input);

        assert_close(b.product_cost, 5000.0);
        assert_close(b.freight, 250.0);
        assert_close(b.insurance, 100.0);
        assert_close(b.customs_value, 5350.0);
        assert_eq!(b.rates.exchange_rate, 5.0);
    }

    #[test]
    fn test_insurance_as_rate_of_product_cost() {
        let input = ShipmentInput {
            insurance: InsuranceInput::Rate(0.01),
            currency: Currency::Usd { exchange_rate: 5.0 },
            ..phones(IcmsSelection::Classification)
        };
        let b = simple(&input);

        // 1% of the BRL product cost, not converted a second time
        assert_close(b.insurance, 50.0);
        assert_close(b.customs_value, 5000.0 + 250.0 + 50.0);
    }

    #[test]
    fn test_zero_quantity_has_zero_cost_per_unit() {
        let input = ShipmentInput {
            quantity: 0.0,
            ..phones(IcmsSelection::Classification)
        };
        let b = simple(&input);

        assert_eq!(b.cost_per_unit, 0.0);
        assert!(b.cost_per_unit.is_finite());
        assert_close(b.product_cost, 0.0);
    }

    #[test]
    fn test_zero_customs_value_has_zero_effective_rate() {
        let input = ShipmentInput {
            quantity: 0.0,
            freight: 0.0,
            insurance: InsuranceInput::Amount(0.0),
            ..phones(IcmsSelection::Classification)
        };
        let b = simple(&input);
        assert_eq!(b.effective_tax_rate, 0.0);
        assert_eq!(b.total_cost, 0.0);
    }

    #[test]
    fn test_icms_rate_one_is_rejected_in_both_modes() {
        for modes in [CalculationModes::simple(), CalculationModes::nationalized()] {
            let err = compute_breakdown(
                &phones(IcmsSelection::Classification),
                &phone_rates(),
                Rate::from_fraction(1.0),
                modes,
            )
            .unwrap_err();
            assert_eq!(err.reason(), RejectionReason::InvalidRate);
        }
    }

    #[test]
    fn test_negative_input_is_rejected() {
        let input = ShipmentInput {
            freight: -1.0,
            ..phones(IcmsSelection::Classification)
        };
        let err = compute_breakdown(
            &input,
            &phone_rates(),
            Rate::from_fraction(0.18),
            CalculationModes::simple(),
        )
        .unwrap_err();
        assert_eq!(err.reason(), RejectionReason::InvalidInput);
    }

    #[test]
    fn test_out_of_range_duty_rates_are_rejected() {
        let rates = RateSet {
            import_tax_rate: Rate::from_fraction(-0.5),
            ipi_rate: Rate::from_fraction(f64::NAN),
            ..phone_rates()
        };
        let err = compute_breakdown(
            &phones(IcmsSelection::Classification),
            &rates,
            Rate::from_fraction(0.18),
            CalculationModes::simple(),
        )
        .unwrap_err();
        assert_eq!(err.reason(), RejectionReason::InvalidRate);

        let rates = RateSet {
            cofins_rate: Rate::from_fraction(1.5),
            ..phone_rates()
        };
        assert!(compute_breakdown(
            &phones(IcmsSelection::Classification),
            &rates,
            Rate::from_fraction(0.18),
            CalculationModes::simple(),
        )
        .is_err());
    }

    #[test]
    fn test_overflowing_amounts_are_rejected() {
        let table = RateTable::builtin().unwrap();
        let engine = TaxEngine::new(&table, CalculationModes::simple());

        let input = ShipmentInput {
            quantity: 1e200,
            unit_cost: 1e200,
            ..phones(IcmsSelection::State("SP".to_string()))
        };
        let err = engine.calculate(&input).unwrap_err();
        assert_eq!(err.reason(), RejectionReason::InvalidInput);
        assert!(matches!(
            err,
            ComexError::InvalidInput(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_tiny_quantity_overflowing_cost_per_unit_is_rejected() {
        let input = ShipmentInput {
            quantity: 1e-300,
            unit_cost: 1e300,
            freight: 1e300,
            ..phones(IcmsSelection::Classification)
        };
        let err = compute_breakdown(
            &input,
            &phone_rates(),
            Rate::from_fraction(0.18),
            CalculationModes::simple(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ComexError::InvalidInput(ValidationError::NotFinite {
                field: "cost_per_unit".to_string(),
            })
        );
    }

    // -------------------------------------------------------------------------
    // TaxEngine (table lookups)
    // -------------------------------------------------------------------------

    #[test]
    fn test_engine_calculate_with_state() {
        let table = RateTable::builtin().unwrap();
        let engine = TaxEngine::new(&table, CalculationModes::simple());

        let b = engine
            .calculate(&phones(IcmsSelection::State("RJ".to_string())))
            .unwrap();
        assert_eq!(b.rates.icms_rate.fraction(), 0.22);
        assert_close(b.icms, 1436.475 * 0.22);
        assert_eq!(b.classification_code, "85171231");
    }

    #[test]
    fn test_engine_calculate_with_custom_icms() {
        let table = RateTable::builtin().unwrap();
        let engine = TaxEngine::new(&table, CalculationModes::simple());

        let b = engine.calculate(&phones(IcmsSelection::Custom(0.12))).unwrap();
        assert_eq!(b.rates.icms_rate.fraction(), 0.12);

        let err = engine
            .calculate(&phones(IcmsSelection::Custom(1.0)))
            .unwrap_err();
        assert_eq!(err.reason(), RejectionReason::InvalidRate);
    }

    #[test]
    fn test_engine_unknown_classification() {
        let table = RateTable::builtin().unwrap();
        let engine = TaxEngine::new(&table, CalculationModes::simple());

        let input = ShipmentInput {
            classification_code: "00000000".to_string(),
            ..phones(IcmsSelection::State("SP".to_string()))
        };
        let err = engine.calculate(&input).unwrap_err();
        assert_eq!(err, ComexError::ClassificationNotFound("00000000".to_string()));
    }

    #[test]
    fn test_engine_unknown_state() {
        let table = RateTable::builtin().unwrap();
        let engine = TaxEngine::new(&table, CalculationModes::simple());

        let err = engine
            .calculate(&phones(IcmsSelection::State("Atlantis".to_string())))
            .unwrap_err();
        assert_eq!(err.reason(), RejectionReason::UnknownState);
    }

    #[test]
    fn test_engine_classification_without_default_icms() {
        let table = RateTable::builtin().unwrap();
        let engine = TaxEngine::new(&table, CalculationModes::simple());

        // Television receivers carry no classification ICMS
        let input = ShipmentInput {
            classification_code: "85287200".to_string(),
            ..phones(IcmsSelection::Classification)
        };
        let err = engine.calculate(&input).unwrap_err();
        assert_eq!(err.reason(), RejectionReason::InvalidInput);
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_customs_value_is_cif(
            quantity in 0.0f64..10_000.0,
            unit_cost in 0.0f64..100_000.0,
            freight in 0.0f64..50_000.0,
            insurance in 0.0f64..10_000.0,
        ) {
            let input = ShipmentInput {
                quantity,
                unit_cost,
                freight,
                insurance: InsuranceInput::Amount(insurance),
                ..phones(IcmsSelection::Classification)
            };
            let b = simple(&input);
            prop_assert_eq!(b.customs_value, b.product_cost + b.freight + b.insurance);
        }

        #[test]
        fn prop_gross_up_satisfies_fixed_point(
            rate in 0.0f64..0.999,
            base in 0.0f64..1_000_000.0,
        ) {
            let icms = gross_up(base, Rate::from_fraction(rate));
            let lhs = icms * (1.0 - rate);
            let rhs = rate * base;
            prop_assert!((lhs - rhs).abs() <= 1e-9 * base.max(1.0));
        }

        #[test]
        fn prop_amounts_are_non_negative(
            quantity in 0.0f64..1_000.0,
            unit_cost in 0.0f64..10_000.0,
            freight in 0.0f64..5_000.0,
            insurance_rate in 0.0f64..1.0,
            icms in 0.0f64..0.99,
            nationalized in any::<bool>(),
        ) {
            let input = ShipmentInput {
                quantity,
                unit_cost,
                freight,
                insurance: InsuranceInput::Rate(insurance_rate),
                ..phones(IcmsSelection::Classification)
            };
            let modes = if nationalized {
                CalculationModes::nationalized()
            } else {
                CalculationModes::simple()
            };
            let b = compute_breakdown(&input, &phone_rates(), Rate::from_fraction(icms), modes)
                .unwrap();
            for amount in [
                b.product_cost, b.freight, b.insurance, b.customs_value, b.import_tax,
                b.ipi, b.pis, b.cofins, b.icms, b.total_taxes, b.afrmm, b.other_costs,
                b.total_cost, b.cost_per_unit,
            ] {
                prop_assert!(amount >= 0.0 && amount.is_finite());
            }
        }
    }
}
