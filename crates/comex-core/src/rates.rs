//! # Reference Rate Tables
//!
//! Static duty rates per NCM classification and ICMS rates per state.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Process start                                                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  RateTable::builtin()  or  RateTable::from_json(custom file contents)  │
//! │     │   validated once: codes, ranges, duplicates, Custom sentinel      │
//! │     ▼                                                                   │
//! │  &RateTable ──► TaxEngine::new(&table, modes) ──► calculate() × N      │
//! │                                                                         │
//! │  Never mutated after construction, so a shared reference is safe to   │
//! │  use from any number of threads.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comex_core::rates::RateTable;
//!
//! let table = RateTable::builtin().unwrap();
//! let rates = table.resolve_rates("8517.12.31").unwrap();
//! assert_eq!(rates.import_tax_rate.fraction(), 0.15);
//!
//! let sp = table.resolve_icms_rate("SP", None).unwrap();
//! assert_eq!(sp.fraction(), 0.18);
//!
//! let custom = table.resolve_icms_rate("Custom", Some(0.12)).unwrap();
//! assert_eq!(custom.fraction(), 0.12);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ComexError, ComexResult, RateTableError, ValidationError};
use crate::types::{Rate, RateSet};
use crate::validation::{normalize_ncm, validate_icms_rate, validate_rate_set};

/// Reference data compiled into the binary.
const BUILTIN_RATES: &str = include_str!("../data/rates.json");

// =============================================================================
// Table Entries
// =============================================================================

/// One NCM classification with its duty rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// 8-digit NCM code.
    pub ncm: String,
    /// Product category shown in selection lists.
    pub description: String,
    pub rates: RateSet,
}

/// One row of the state ICMS table.
///
/// `icms_rate` is `None` only for the `Custom` sentinel, whose rate is
/// supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StateIcms {
    /// Two-letter UF code (`SP`), or `CUSTOM` for the sentinel.
    pub code: String,
    pub name: String,
    pub icms_rate: Option<Rate>,
}

impl StateIcms {
    /// True for the caller-supplied override entry.
    pub fn is_custom(&self) -> bool {
        self.icms_rate.is_none()
    }

    fn matches(&self, key: &str) -> bool {
        self.code.eq_ignore_ascii_case(key) || self.name.to_lowercase() == key.to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
struct RateTableDocument {
    classifications: Vec<Classification>,
    states: Vec<StateIcms>,
}

// =============================================================================
// Rate Table
// =============================================================================

/// Immutable rate reference data.
#[derive(Debug, Clone)]
pub struct RateTable {
    classifications: BTreeMap<String, Classification>,
    states: Vec<StateIcms>,
}

impl RateTable {
    /// Loads the rate table shipped with the crate.
    pub fn builtin() -> Result<Self, RateTableError> {
        Self::from_json(BUILTIN_RATES)
    }

    /// Parses and validates a rate table document.
    ///
    /// ## Rules
    /// - Every NCM is 8 digits (dots allowed) and appears once
    /// - Every duty rate is a fraction in `[0, 1]`
    /// - Every ICMS rate is in `[0, 1)`
    /// - States are unique by code and name
    /// - Exactly one `Custom` entry (rate `null`)
    pub fn from_json(json: &str) -> Result<Self, RateTableError> {
        let document: RateTableDocument = serde_json::from_str(json)?;

        let mut classifications = BTreeMap::new();
        for mut entry in document.classifications {
            let ncm = normalize_ncm(&entry.ncm).map_err(|e| RateTableError::InvalidEntry {
                entry: entry.ncm.clone(),
                reason: e.to_string(),
            })?;
            validate_rate_set(&entry.rates).map_err(|e| RateTableError::InvalidEntry {
                entry: ncm.clone(),
                reason: e.to_string(),
            })?;

            entry.ncm = ncm.clone();
            if classifications.insert(ncm.clone(), entry).is_some() {
                return Err(RateTableError::Duplicate(ncm));
            }
        }

        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        for state in &document.states {
            if !codes.insert(state.code.to_lowercase()) || !names.insert(state.name.to_lowercase())
            {
                return Err(RateTableError::Duplicate(state.name.clone()));
            }
            if let Some(rate) = state.icms_rate {
                validate_icms_rate("icms_rate", rate.fraction()).map_err(|e| {
                    RateTableError::InvalidEntry {
                        entry: state.name.clone(),
                        reason: e.to_string(),
                    }
                })?;
            }
        }

        let custom_entries = document.states.iter().filter(|s| s.is_custom()).count();
        if custom_entries != 1 {
            return Err(RateTableError::CustomEntryCount(custom_entries));
        }

        Ok(RateTable {
            classifications,
            states: document.states,
        })
    }

    /// Looks up the duty rates for an NCM code.
    ///
    /// ## Errors
    /// - `InvalidInput` when the code is not 8 digits
    /// - `ClassificationNotFound` when the table does not carry it; the
    ///   caller never receives zero rates in its place
    pub fn resolve_rates(&self, classification_code: &str) -> ComexResult<RateSet> {
        let ncm = normalize_ncm(classification_code)?;

        self.classifications
            .get(&ncm)
            .map(|c| c.rates)
            .ok_or(ComexError::ClassificationNotFound(ncm))
    }

    /// Resolves the ICMS rate for a destination state.
    ///
    /// `state` matches a UF code or state name, ignoring case. For the
    /// `Custom` entry the rate is `custom_override`, which must be in
    /// `[0, 1)`.
    ///
    /// ## User Workflow
    /// ```text
    /// state = "SP"      ──► table lookup ──► 0.18
    /// state = "Custom"  ──► custom_override
    ///                         ├── None      → InvalidInput (required)
    ///                         ├── ≥ 1       → InvalidRate
    ///                         └── 0.12      → 0.12
    /// state = "Atlantis" ─► StateNotFound
    /// ```
    pub fn resolve_icms_rate(&self, state: &str, custom_override: Option<f64>) -> ComexResult<Rate> {
        let key = state.trim();

        let entry = self
            .states
            .iter()
            .find(|s| s.matches(key))
            .ok_or_else(|| ComexError::StateNotFound(key.to_string()))?;

        match entry.icms_rate {
            Some(rate) => Ok(rate),
            None => {
                let value = custom_override.ok_or_else(|| ValidationError::Required {
                    field: "custom_icms_rate".to_string(),
                })?;
                validate_icms_rate("custom_icms_rate", value)
            }
        }
    }

    /// Returns the classification entry for an NCM code.
    pub fn classification(&self, classification_code: &str) -> ComexResult<&Classification> {
        let ncm = normalize_ncm(classification_code)?;

        self.classifications
            .get(&ncm)
            .ok_or(ComexError::ClassificationNotFound(ncm))
    }

    /// All classifications, ordered by NCM.
    pub fn classifications(&self) -> impl Iterator<Item = &Classification> {
        self.classifications.values()
    }

    /// All states in table order, `Custom` included.
    pub fn states(&self) -> &[StateIcms] {
        &self.states
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
