use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{IndicatorOpsError, Result};

/// One observation from an indicator's recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Raw indicator metadata as received at the ingest boundary.
///
/// Immutable per classification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorDescriptor {
    /// Stable identifier for this indicator
    pub id: String,

    /// Human-readable indicator name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_raw: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// Source-declared reporting periodicity hint ("Monthly", "Quarterly", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_method: Option<String>,

    /// Source-declared scale hint ("Thousand", "Million", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    /// Recent observations, ordered by date ascending
    #[serde(default)]
    pub sample_values: Vec<SamplePoint>,
}

impl IndicatorDescriptor {
    /// Sample history cap applied at the ingest boundary.
    pub const MAX_SAMPLE_POINTS: usize = 50;

    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            units_raw: None,
            long_name: None,
            source_name: None,
            periodicity: None,
            aggregation_method: None,
            scale: None,
            topic: None,
            category_group: None,
            dataset: None,
            currency_code: None,
            definition: None,
            sample_values: Vec::new(),
        }
    }

    pub fn with_units<S: Into<String>>(mut self, units: S) -> Self {
        self.units_raw = Some(units.into());
        self
    }

    pub fn with_periodicity<S: Into<String>>(mut self, periodicity: S) -> Self {
        self.periodicity = Some(periodicity.into());
        self
    }

    pub fn with_scale<S: Into<String>>(mut self, scale: S) -> Self {
        self.scale = Some(scale.into());
        self
    }

    pub fn with_samples(mut self, samples: Vec<SamplePoint>) -> Self {
        self.sample_values = samples;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(IndicatorOpsError::validation("<unknown>", "indicator id is empty"));
        }
        if self.name.is_empty() {
            return Err(IndicatorOpsError::validation(&self.id, "indicator name is empty"));
        }
        for sample in &self.sample_values {
            if !sample.value.is_finite() {
                return Err(IndicatorOpsError::validation(
                    &self.id,
                    format!("non-finite sample value at {}", sample.date),
                ));
            }
        }
        Ok(())
    }

    /// Keep only the most recent `MAX_SAMPLE_POINTS` observations.
    ///
    /// Applied once at the ingest boundary; the descriptor is read-only after.
    pub fn trim_samples(&mut self) {
        if self.sample_values.len() <= Self::MAX_SAMPLE_POINTS {
            return;
        }
        self.sample_values.sort_by_key(|s| s.date);
        let excess = self.sample_values.len() - Self::MAX_SAMPLE_POINTS;
        self.sample_values.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date: &str, value: f64) -> SamplePoint {
        SamplePoint {
            date: date.parse().unwrap(),
            value,
        }
    }

    #[test]
    fn test_descriptor_validation() {
        let descriptor = IndicatorDescriptor::new("GDP_USA", "GDP").with_units("USD Billion");
        assert!(descriptor.validate().is_ok());

        let empty = IndicatorDescriptor::new("", "GDP");
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_trim_keeps_most_recent() {
        let samples: Vec<SamplePoint> = (1..=60)
            .map(|day| sample(&format!("2024-01-{:02}", (day % 28) + 1), day as f64))
            .collect();
        let mut descriptor =
            IndicatorDescriptor::new("X", "Exports").with_samples(samples);
        descriptor.trim_samples();
        assert_eq!(descriptor.sample_values.len(), IndicatorDescriptor::MAX_SAMPLE_POINTS);

        // Remaining points are the latest by date
        let min_kept = descriptor.sample_values.iter().map(|s| s.date).min().unwrap();
        assert!(min_kept >= "2024-01-03".parse().unwrap());
    }

    #[test]
    fn test_trim_noop_under_cap() {
        let mut descriptor = IndicatorDescriptor::new("X", "Exports")
            .with_samples(vec![sample("2024-03-01", 1.0), sample("2024-02-01", 2.0)]);
        descriptor.trim_samples();
        assert_eq!(descriptor.sample_values.len(), 2);
        // Order untouched when nothing is trimmed
        assert_eq!(descriptor.sample_values[0].value, 1.0);
    }
}
