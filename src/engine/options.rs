//! Normalization engine configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::convert::FxTable;
use crate::domain::{DataPoint, IndicatorOpsError, Magnitude, Result, TimeScale};

/// Dimension the auto-target selector may derive per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDimension {
    Currency,
    Magnitude,
    Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurrencyTieBreaker {
    #[serde(rename = "prefer-targetCurrency")]
    PreferTargetCurrency,
    PreferBase,
    #[serde(untagged)]
    Explicit(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MagnitudeTieBreaker {
    PreferMillions,
    #[serde(untagged)]
    Explicit(Vec<Magnitude>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeTieBreaker {
    PreferMonth,
    #[serde(untagged)]
    Explicit(Vec<TimeScale>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TieBreakers {
    pub currency: CurrencyTieBreaker,
    pub magnitude: MagnitudeTieBreaker,
    pub time: TimeTieBreaker,
}

impl Default for TieBreakers {
    fn default() -> Self {
        Self {
            currency: CurrencyTieBreaker::PreferTargetCurrency,
            magnitude: MagnitudeTieBreaker::PreferMillions,
            time: TimeTieBreaker::PreferMonth,
        }
    }
}

/// Indicators excluded from normalization entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exemptions {
    pub indicator_ids: Vec<String>,
    pub category_groups: Vec<String>,
    /// Substring match, case-insensitive
    pub indicator_names: Vec<String>,
}

impl Exemptions {
    pub fn is_exempt(&self, point: &DataPoint) -> bool {
        if self.indicator_ids.iter().any(|id| id == &point.id) {
            return true;
        }
        if let Some(group) = point.metadata_str("categoryGroup") {
            if self.category_groups.iter().any(|g| g == group) {
                return true;
            }
        }
        let name = point.name.to_lowercase();
        self.indicator_names
            .iter()
            .any(|n| name.contains(&n.to_lowercase()))
    }
}

/// Per-indicator unit override applied before parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitOverride {
    pub indicator_ids: Vec<String>,
    /// Substring match, case-insensitive
    pub indicator_names: Vec<String>,
    pub override_unit: String,
    pub override_scale: Option<Magnitude>,
    pub reason: String,
}

impl UnitOverride {
    pub fn applies_to(&self, point: &DataPoint) -> bool {
        if self.indicator_ids.iter().any(|id| id == &point.id) {
            return true;
        }
        let name = point.name.to_lowercase();
        self.indicator_names
            .iter()
            .any(|n| name.contains(&n.to_lowercase()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecialHandling {
    pub unit_overrides: Vec<UnitOverride>,
}

/// Thresholds for the quality detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityConfig {
    /// Minimum share for the dominant magnitude cluster
    pub cluster_threshold: f64,
    /// Order-of-magnitude distance that makes a value an outlier
    pub magnitude_difference_threshold: i32,
    /// Minimum share for the dominant semantic type
    pub dominant_type_threshold: f64,
    /// Drop items with an incompatible semantic type instead of flagging them
    pub filter_inconsistent_types: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.6,
            magnitude_difference_threshold: 2,
            dominant_type_threshold: 0.67,
            filter_inconsistent_types: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Per-item errors skip the item and continue the batch
    Skip,
    /// Per-item errors abort the batch
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizationOptions {
    pub target_currency: Option<String>,
    pub target_magnitude: Option<Magnitude>,
    pub target_time_scale: Option<TimeScale>,

    pub auto_target_by_indicator: bool,
    pub auto_target_dimensions: HashSet<TargetDimension>,

    /// Field used to group items ("name", "id", or a metadata key)
    pub indicator_key: String,

    pub min_majority_share: f64,
    pub tie_breakers: TieBreakers,

    pub min_quality_score: f64,

    /// Drop index/points items from monetary-flow domains that cannot use
    /// them. `None` means the per-domain default (wages: true).
    pub exclude_index_values: Option<bool>,

    /// Emit the provenance record on every item
    pub explain: bool,

    pub use_live_fx: bool,
    pub live_fx: Option<FxTable>,
    pub fx_fallback: Option<FxTable>,

    pub exemptions: Exemptions,
    pub special_handling: SpecialHandling,
    pub quality: QualityConfig,
    pub handle_errors: ErrorHandling,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            target_currency: None,
            target_magnitude: None,
            target_time_scale: None,
            auto_target_by_indicator: false,
            auto_target_dimensions: HashSet::from([
                TargetDimension::Currency,
                TargetDimension::Magnitude,
                TargetDimension::Time,
            ]),
            indicator_key: "name".to_string(),
            min_majority_share: 0.5,
            tie_breakers: TieBreakers::default(),
            min_quality_score: 70.0,
            exclude_index_values: None,
            explain: true,
            use_live_fx: false,
            live_fx: None,
            fx_fallback: None,
            exemptions: Exemptions::default(),
            special_handling: SpecialHandling::default(),
            quality: QualityConfig::default(),
            handle_errors: ErrorHandling::Skip,
        }
    }
}

impl NormalizationOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_majority_share) {
            return Err(IndicatorOpsError::config(format!(
                "minMajorityShare must be in [0,1], got {}",
                self.min_majority_share
            )));
        }
        if !(0.0..=100.0).contains(&self.min_quality_score) {
            return Err(IndicatorOpsError::config(format!(
                "minQualityScore must be in [0,100], got {}",
                self.min_quality_score
            )));
        }
        if let Some(table) = &self.live_fx {
            table.validate()?;
        }
        if let Some(table) = &self.fx_fallback {
            table.validate()?;
        }
        if let Some(code) = &self.target_currency {
            if code.len() != 3 {
                return Err(IndicatorOpsError::config(format!(
                    "targetCurrency must be a 3-letter code, got \"{code}\""
                )));
            }
        }
        Ok(())
    }

    /// The FX table in effect plus its provenance label.
    pub fn fx_table(&self) -> Option<(&FxTable, crate::domain::FxSource)> {
        if self.use_live_fx {
            if let Some(table) = &self.live_fx {
                return Some((table, crate::domain::FxSource::Live));
            }
        }
        self.fx_fallback
            .as_ref()
            .map(|table| (table, crate::domain::FxSource::Fallback))
    }

    /// Group key for a data point, per `indicator_key`.
    pub fn group_key(&self, point: &DataPoint) -> String {
        match self.indicator_key.as_str() {
            "name" => point.name.clone(),
            "id" => point.id.clone(),
            key => point
                .metadata_str(key)
                .map(str::to_string)
                .unwrap_or_else(|| point.name.clone()),
        }
    }
}
