//! # Calculation Request
//!
//! The loosely typed request a form or HTTP client sends, and its coercion
//! into a [`ShipmentInput`].
//!
//! ## Wire Format
//! ```json
//! {
//!   "ncm": "8517.12.31",
//!   "quantity": "10",
//!   "productCost": 100,
//!   "freight": "50,00",
//!   "insurance": 20,
//!   "currency": "USD",
//!   "exchangeRate": 5.12,
//!   "state": "SP"
//! }
//! ```
//!
//! Numeric fields accept JSON numbers or numeric strings; a single comma is
//! read as the decimal separator. `freight` and `insurance` default to 0.
//! Range checks (negative amounts, ICMS < 1) are left to the engine so that
//! they report the same reasons whichever way the input arrived.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{Currency, IcmsSelection, InsuranceInput, ShipmentInput};
use crate::validation::ValidationResult;
use crate::CUSTOM_STATE;

/// A JSON number or a numeric string.
///
/// Any other JSON value lands in `Invalid` so that a mistyped field is
/// reported against its name instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
    #[ts(type = "unknown")]
    Invalid(Value),
}

impl From<f64> for NumericField {
    fn from(value: f64) -> Self {
        NumericField::Number(value)
    }
}

impl From<&str> for NumericField {
    fn from(value: &str) -> Self {
        NumericField::Text(value.to_string())
    }
}

/// A JSON string; anything else lands in `Invalid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum TextField {
    Text(String),
    #[ts(type = "unknown")]
    Invalid(Value),
}

impl From<&str> for TextField {
    fn from(value: &str) -> Self {
        TextField::Text(value.to_string())
    }
}

/// Raw calculation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    /// NCM code. `category` and `classificationCode` are accepted too.
    #[serde(default, alias = "category", alias = "classificationCode")]
    pub ncm: Option<TextField>,
    #[serde(default)]
    pub quantity: Option<NumericField>,
    /// Cost per unit.
    #[serde(default, alias = "unitCost")]
    pub product_cost: Option<NumericField>,
    #[serde(default)]
    pub freight: Option<NumericField>,
    /// Absolute insurance amount.
    #[serde(default)]
    pub insurance: Option<NumericField>,
    /// Insurance as a fraction of product cost; excludes `insurance`.
    #[serde(default)]
    pub insurance_rate: Option<NumericField>,
    /// `BRL` (default) or `USD`.
    #[serde(default)]
    pub currency: Option<TextField>,
    /// BRL per USD. Implies USD when `currency` is absent.
    #[serde(default)]
    pub exchange_rate: Option<NumericField>,
    /// UF code, state name, or `Custom`.
    #[serde(default)]
    pub state: Option<TextField>,
    /// ICMS override for the `Custom` state.
    #[serde(default)]
    pub custom_icms_rate: Option<NumericField>,
}

impl CalculationRequest {
    /// Coerces the raw request into a [`ShipmentInput`].
    ///
    /// ## Errors
    /// `ValidationError` naming the first offending field.
    pub fn into_input(self) -> ValidationResult<ShipmentInput> {
        let classification_code = parse_text("ncm", self.ncm)?.ok_or_else(|| required("ncm"))?;

        let quantity = parse_required("quantity", self.quantity)?;
        let unit_cost = parse_required("productCost", self.product_cost)?;
        let freight = parse_optional("freight", self.freight)?.unwrap_or(0.0);

        let insurance = match (
            parse_optional("insurance", self.insurance)?,
            parse_optional("insuranceRate", self.insurance_rate)?,
        ) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::InvalidFormat {
                    field: "insurance".to_string(),
                    reason: "give either insurance or insuranceRate, not both".to_string(),
                })
            }
            (None, Some(rate)) => InsuranceInput::Rate(rate),
            (amount, None) => InsuranceInput::Amount(amount.unwrap_or(0.0)),
        };

        let exchange_rate = parse_optional("exchangeRate", self.exchange_rate)?;
        let currency = match parse_text("currency", self.currency)?.as_deref() {
            None => match exchange_rate {
                Some(exchange_rate) => Currency::Usd { exchange_rate },
                None => Currency::Brl,
            },
            Some(code) if code.eq_ignore_ascii_case("BRL") => {
                if exchange_rate.is_some() {
                    return Err(ValidationError::InvalidFormat {
                        field: "exchangeRate".to_string(),
                        reason: "only applies to USD amounts".to_string(),
                    });
                }
                Currency::Brl
            }
            Some(code) if code.eq_ignore_ascii_case("USD") => Currency::Usd {
                exchange_rate: exchange_rate.ok_or_else(|| required("exchangeRate"))?,
            },
            Some(_) => {
                return Err(ValidationError::NotAllowed {
                    field: "currency".to_string(),
                    allowed: vec!["BRL".to_string(), "USD".to_string()],
                })
            }
        };

        let custom_icms_rate = parse_optional("customIcmsRate", self.custom_icms_rate)?;
        let icms = match parse_text("state", self.state)? {
            Some(state) if state.eq_ignore_ascii_case(CUSTOM_STATE) => IcmsSelection::Custom(
                custom_icms_rate.ok_or_else(|| required("customIcmsRate"))?,
            ),
            Some(state) => IcmsSelection::State(state),
            None => match custom_icms_rate {
                Some(rate) => IcmsSelection::Custom(rate),
                None => IcmsSelection::Classification,
            },
        };

        Ok(ShipmentInput {
            classification_code,
            quantity,
            unit_cost,
            freight,
            insurance,
            currency,
            icms,
        })
    }
}

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn parse_required(field: &str, value: Option<NumericField>) -> ValidationResult<f64> {
    parse_optional(field, value)?.ok_or_else(|| required(field))
}

/// Blank strings count as absent.
fn parse_optional(field: &str, value: Option<NumericField>) -> ValidationResult<Option<f64>> {
    let number = match value {
        None => return Ok(None),
        Some(NumericField::Number(n)) => n,
        Some(NumericField::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            parse_decimal(text).ok_or_else(|| ValidationError::NotANumber {
                field: field.to_string(),
                value: text.to_string(),
            })?
        }
        Some(NumericField::Invalid(value)) => {
            return Err(ValidationError::NotANumber {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
    };

    if !number.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    Ok(Some(number))
}

/// Trimmed text; blank strings count as absent.
fn parse_text(field: &str, value: Option<TextField>) -> ValidationResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(TextField::Text(text)) => {
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_string()))
        }
        Some(TextField::Invalid(value)) => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("must be a string, got {}", value),
        }),
    }
}

/// `"1070.50"` and `"1070,50"` both read as 1070.5.
fn parse_decimal(text: &str) -> Option<f64> {
    let normalized = if !text.contains('.') && text.matches(',').count() == 1 {
        text.replace(',', ".")
    } else {
        text.to_string()
    };

    // Reject words f64::from_str would accept ("inf", "NaN")
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }

    normalized.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CalculationRequest {
        CalculationRequest {
            ncm: Some("85171231".into()),
            quantity: Some(NumericField::Number(10.0)),
            product_cost: Some(NumericField::Number(100.0)),
            freight: Some(NumericField::Number(50.0)),
            insurance: Some(NumericField::Number(20.0)),
            state: Some("SP".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_request() {
        let input = request().into_input().unwrap();
        assert_eq!(input.classification_code, "85171231");
        assert_eq!(input.quantity, 10.0);
        assert_eq!(input.unit_cost, 100.0);
        assert_eq!(input.insurance, InsuranceInput::Amount(20.0));
        assert_eq!(input.currency, Currency::Brl);
        assert_eq!(input.icms, IcmsSelection::State("SP".to_string()));
    }

    #[test]
    fn test_json_with_strings_and_aliases() {
        let json = r#"{
            "category": "8517.12.31",
            "quantity": "10",
            "productCost": "100,50",
            "insuranceRate": "0.01",
            "exchangeRate": 5.2
        }"#;
        let input: ShipmentInput = serde_json::from_str::<CalculationRequest>(json)
            .unwrap()
            .into_input()
            .unwrap();

        assert_eq!(input.classification_code, "8517.12.31");
        assert_eq!(input.unit_cost, 100.5);
        assert_eq!(input.freight, 0.0);
        assert_eq!(input.insurance, InsuranceInput::Rate(0.01));
        assert_eq!(input.currency, Currency::Usd { exchange_rate: 5.2 });
        assert_eq!(input.icms, IcmsSelection::Classification);
    }

    #[test]
    fn test_missing_fields() {
        let err = CalculationRequest {
            ncm: None,
            ..request()
        }
        .into_input()
        .unwrap_err();
        assert_eq!(err, required("ncm"));

        let err = CalculationRequest {
            quantity: Some("  ".into()),
            ..request()
        }
        .into_input()
        .unwrap_err();
        assert_eq!(err, required("quantity"));
    }

    #[test]
    fn test_non_numeric_fields() {
        let err = CalculationRequest {
            freight: Some("abc".into()),
            ..request()
        }
        .into_input()
        .unwrap_err();
        assert!(matches!(err, ValidationError::NotANumber { .. }));

        let err = CalculationRequest {
            product_cost: Some("inf".into()),
            ..request()
        }
        .into_input()
        .unwrap_err();
        assert!(matches!(err, ValidationError::NotANumber { .. }));
    }

    #[test]
    fn test_negative_values_pass_coercion() {
        let input = CalculationRequest {
            freight: Some("-5".into()),
            ..request()
        }
        .into_input()
        .unwrap();
        assert_eq!(input.freight, -5.0);
    }

    #[test]
    fn test_insurance_modes_are_exclusive() {
        let err = CalculationRequest {
            insurance_rate: Some(NumericField::Number(0.01)),
            ..request()
        }
        .into_input()
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_currency_rules() {
        let usd_without_rate = CalculationRequest {
            currency: Some("usd".into()),
            ..request()
        };
        assert_eq!(
            usd_without_rate.into_input().unwrap_err(),
            required("exchangeRate")
        );

        let brl_with_rate = CalculationRequest {
            currency: Some("BRL".into()),
            exchange_rate: Some(NumericField::Number(5.0)),
            ..request()
        };
        assert!(brl_with_rate.into_input().is_err());

        let euro = CalculationRequest {
            currency: Some("EUR".into()),
            ..request()
        };
        assert!(matches!(
            euro.into_input().unwrap_err(),
            ValidationError::NotAllowed { .. }
        ));
    }

    #[test]
    fn test_custom_state() {
        let input = CalculationRequest {
            state: Some("Custom".into()),
            custom_icms_rate: Some("0,12".into()),
            ..request()
        }
        .into_input()
        .unwrap();
        assert_eq!(input.icms, IcmsSelection::Custom(0.12));

        let err = CalculationRequest {
            state: Some("custom".into()),
            ..request()
        }
        .into_input()
        .unwrap_err();
        assert_eq!(err, required("customIcmsRate"));
    }

    #[test]
    fn test_mistyped_fields_are_validation_errors() {
        let json = r#"{"ncm": "85171231", "quantity": true, "productCost": 100}"#;
        let err = serde_json::from_str::<CalculationRequest>(json)
            .unwrap()
            .into_input()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotANumber {
                field: "quantity".to_string(),
                value: "true".to_string(),
            }
        );

        let json = r#"{"ncm": 85171231, "quantity": 1, "productCost": 100}"#;
        let err = serde_json::from_str::<CalculationRequest>(json)
            .unwrap()
            .into_input()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { ref field, .. } if field == "ncm"));

        let json = r#"{"ncm": "85171231", "quantity": 1, "productCost": [100], "state": {}}"#;
        let err = serde_json::from_str::<CalculationRequest>(json)
            .unwrap()
            .into_input()
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotANumber { ref field, .. } if field == "productCost"));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1070.50"), Some(1070.5));
        assert_eq!(parse_decimal("1070,50"), Some(1070.5));
        assert_eq!(parse_decimal("1e3"), Some(1000.0));
        assert_eq!(parse_decimal("1,070,50"), None);
        assert_eq!(parse_decimal("NaN"), None);
    }
}
