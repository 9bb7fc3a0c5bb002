//! # Report Projection
//!
//! Turns a [`CostBreakdown`] into ordered, centavo-rounded line items for a
//! document renderer.
//!
//! Each line is rounded on its own, so the rounded lines may differ from the
//! rounded total by a centavo. The total line is always rounded from the
//! full-precision total.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CostBreakdown, IcmsMode, IpiBase, Rate};

/// What a report line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Product, freight, insurance.
    Value,
    /// Customs value, total taxes, total cost.
    Subtotal,
    Tax,
    /// Nationalization costs.
    Expense,
    PerUnit,
}

/// One printable line of a cost report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub kind: LineKind,
    pub label: String,
    pub amount: Money,
    /// Rate behind a tax or expense line.
    pub rate: Option<Rate>,
}

impl ReportLine {
    fn new(kind: LineKind, label: &str, amount: f64) -> Self {
        ReportLine {
            kind,
            label: label.to_string(),
            amount: Money::from_reais(amount),
            rate: None,
        }
    }

    fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }
}

impl CostBreakdown {
    /// Projects every field into report line items, in calculation order.
    ///
    /// Nationalization lines appear only when nationalization is modeled.
    pub fn report_lines(&self) -> Vec<ReportLine> {
        let rates = &self.rates;

        let ipi_label = match self.modes.ipi_base {
            IpiBase::CustomsValue => "IPI",
            IpiBase::CustomsValuePlusImportTax => "IPI (on customs value + II)",
        };
        let icms_label = match self.modes.icms {
            IcmsMode::Simple => "ICMS",
            IcmsMode::GrossUp => "ICMS (gross-up)",
        };

        let mut lines = vec![
            ReportLine::new(LineKind::Value, "Product cost", self.product_cost),
            ReportLine::new(LineKind::Value, "Freight", self.freight),
            ReportLine::new(LineKind::Value, "Insurance", self.insurance),
            ReportLine::new(LineKind::Subtotal, "Customs value (CIF)", self.customs_value),
            ReportLine::new(LineKind::Tax, "II (import tax)", self.import_tax)
                .with_rate(rates.import_tax_rate),
            ReportLine::new(LineKind::Tax, ipi_label, self.ipi).with_rate(rates.ipi_rate),
            ReportLine::new(LineKind::Tax, "PIS", self.pis).with_rate(rates.pis_rate),
            ReportLine::new(LineKind::Tax, "COFINS", self.cofins).with_rate(rates.cofins_rate),
            ReportLine::new(LineKind::Tax, icms_label, self.icms).with_rate(rates.icms_rate),
            ReportLine::new(LineKind::Subtotal, "Total taxes", self.total_taxes),
        ];

        if self.modes.nationalization {
            lines.push(
                ReportLine::new(LineKind::Expense, "AFRMM", self.afrmm)
                    .with_rate(Rate::from_fraction(crate::AFRMM_FREIGHT_RATE)),
            );
            lines.push(
                ReportLine::new(LineKind::Expense, "Other nationalization costs", self.other_costs)
                    .with_rate(Rate::from_fraction(crate::OTHER_COSTS_RATE)),
            );
        }

        lines.push(ReportLine::new(LineKind::Subtotal, "Total cost", self.total_cost));
        lines.push(ReportLine::new(LineKind::PerUnit, "Cost per unit", self.cost_per_unit));

        lines
    }
}
