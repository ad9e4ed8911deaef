use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{IndicatorOpsError, Result};
use super::explain::ExplainRecord;
use super::vocab::IndicatorType;

/// One classified data point entering the normalization engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub unit: String,

    /// Reporting periodicity hint ("Monthly", "quarter", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<String>,

    /// Magnitude hint as written by the source ("Thousand", "millions", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,

    /// Classifier-assigned type; wins over parser inference when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator_type: Option<IndicatorType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_currency_denominated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl DataPoint {
    pub fn new<I, N, U>(id: I, name: N, value: f64, unit: U) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        U: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            value,
            unit: unit.into(),
            periodicity: None,
            scale: None,
            currency_code: None,
            indicator_type: None,
            is_currency_denominated: None,
            date: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_periodicity<S: Into<String>>(mut self, periodicity: S) -> Self {
        self.periodicity = Some(periodicity.into());
        self
    }

    pub fn with_scale<S: Into<String>>(mut self, scale: S) -> Self {
        self.scale = Some(scale.into());
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, code: S) -> Self {
        self.currency_code = Some(code.into());
        self
    }

    pub fn with_indicator_type(mut self, ty: IndicatorType) -> Self {
        self.indicator_type = Some(ty);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(IndicatorOpsError::validation("<unknown>", "data point id is empty"));
        }
        if !self.value.is_finite() {
            return Err(IndicatorOpsError::validation(
                &self.id,
                format!("non-finite value {}", self.value),
            ));
        }
        Ok(())
    }

    /// Metadata lookup used by exemption matching and grouping.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Engine output: the original point plus the normalized value, unit, and
/// provenance. Not persisted by the engine; returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDataPoint {
    #[serde(flatten)]
    pub point: DataPoint,

    pub normalized: f64,
    pub normalized_unit: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ExplainRecord>,
}
