//! FX conversion over a caller-supplied rate table.
//!
//! Table convention: `value_in_base = value_in_currency / rates[currency]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FxSource, IndicatorOpsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxTable {
    /// Base currency of the table
    pub base: String,

    /// Currency code -> units of that currency per one unit of base
    pub rates: HashMap<String, f64>,

    /// Optional per-currency quote dates (ISO)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub dates: HashMap<String, String>,
}

impl FxTable {
    pub fn new<S: Into<String>>(base: S, rates: HashMap<String, f64>) -> Self {
        Self {
            base: base.into(),
            rates,
            dates: HashMap::new(),
        }
    }

    /// A table is usable only if its base rate, when present, is exactly 1.
    pub fn validate(&self) -> Result<()> {
        if self.base.is_empty() {
            return Err(IndicatorOpsError::FxTableInvariant(
                "table has no base currency".to_string(),
            ));
        }
        if let Some(base_rate) = self.rates.get(&self.base) {
            if (base_rate - 1.0).abs() > 1e-9 {
                return Err(IndicatorOpsError::FxTableInvariant(format!(
                    "rate for base {} is {}, expected 1",
                    self.base, base_rate
                )));
            }
        }
        for (code, rate) in &self.rates {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(IndicatorOpsError::FxTableInvariant(format!(
                    "rate for {code} is {rate}"
                )));
            }
        }
        Ok(())
    }

    fn rate(&self, currency: &str) -> Option<f64> {
        if currency == self.base {
            return Some(1.0);
        }
        self.rates.get(currency).copied()
    }

    fn as_of(&self, currency: &str) -> Option<String> {
        self.dates.get(currency).cloned()
    }
}

/// Result of an FX factor derivation, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxQuote {
    /// Multiplier: `value * factor = value in target currency`
    pub factor: f64,
    pub source: FxSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct FxConverter {
    source: FxSource,
}

impl FxConverter {
    pub fn new(source: FxSource) -> Self {
        Self { source }
    }

    /// Factor such that `value_in_from * factor = value_in_to`.
    pub fn factor(&self, from: &str, to: &str, table: &FxTable) -> Result<FxQuote> {
        table.validate()?;

        if from == to {
            return Ok(FxQuote {
                factor: 1.0,
                source: self.source,
                as_of: None,
            });
        }

        let from_rate = table
            .rate(from)
            .ok_or_else(|| IndicatorOpsError::MissingFxRate {
                currency: from.to_string(),
            })?;
        let to_rate = table.rate(to).ok_or_else(|| IndicatorOpsError::MissingFxRate {
            currency: to.to_string(),
        })?;

        // to_base(from) = 1 / rates[from]; then scale up into the target.
        let factor = (1.0 / from_rate) * to_rate;
        let as_of = table.as_of(from).or_else(|| table.as_of(to));

        Ok(FxQuote {
            factor,
            source: self.source,
            as_of,
        })
    }

    pub fn convert(&self, value: f64, from: &str, to: &str, table: &FxTable) -> Result<(f64, FxQuote)> {
        let quote = self.factor(from, to, table)?;
        Ok((value * quote.factor, quote))
    }
}
