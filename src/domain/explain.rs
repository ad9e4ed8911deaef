use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::vocab::{Magnitude, TimeScale};

/// Routing label identifying which per-domain policy was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Exempt,
    Emissions,
    Energy,
    Commodities,
    Agriculture,
    Metals,
    Crypto,
    Index,
    Duration,
    Ratios,
    Counts,
    Percentages,
    Wages,
    Monetary,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Exempt => "exempt",
            Domain::Emissions => "emissions",
            Domain::Energy => "energy",
            Domain::Commodities => "commodities",
            Domain::Agriculture => "agriculture",
            Domain::Metals => "metals",
            Domain::Crypto => "crypto",
            Domain::Index => "index",
            Domain::Duration => "duration",
            Domain::Ratios => "ratios",
            Domain::Counts => "counts",
            Domain::Percentages => "percentages",
            Domain::Wages => "wages",
            Domain::Monetary => "monetary",
        }
    }

    /// Domains that are dimensionless or non-monetary and never attach an FX step.
    pub fn is_non_monetary(&self) -> bool {
        matches!(
            self,
            Domain::Index
                | Domain::Percentages
                | Domain::Counts
                | Domain::Ratios
                | Domain::Duration
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an FX factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FxSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    pub normalized: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnitudeChange {
    pub original: Magnitude,
    pub normalized: Magnitude,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChange {
    pub original: TimeScale,
    pub normalized: TimeScale,
    pub factor: f64,
    pub day_count_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxExplain {
    /// Multiplier applied to move from source to target currency
    pub rate: f64,
    pub source: FxSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<String>,
}

/// One multiplicative link in the conversion chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStep {
    pub label: String,
    pub factor: f64,
    pub input: f64,
    pub output: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionTrace {
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<ConversionStep>,
}

impl ConversionTrace {
    pub fn pass_through<S: Into<String>>(summary: S) -> Self {
        Self {
            summary: summary.into(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityWarningKind {
    ScaleOutlier,
    UnitTypeMismatch,
    MissingFxRate,
    ScaleConflict,
    ParseFailure,
    LowQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityWarning {
    pub kind: QualityWarningKind,
    pub message: String,
}

impl QualityWarning {
    pub fn new<S: Into<String>>(kind: QualityWarningKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// How the conversion target was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetMode {
    Configured,
    AutoByIndicator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<Magnitude>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeScale>,
}

/// Label -> share maps per dimension. BTreeMap keeps the serialized form
/// stable for byte-identical reprocessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetShares {
    #[serde(default)]
    pub currency: BTreeMap<String, f64>,
    #[serde(default)]
    pub magnitude: BTreeMap<String, f64>,
    #[serde(default)]
    pub time: BTreeMap<String, f64>,
}

/// Outcome of auto-target derivation for one indicator group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelection {
    pub mode: TargetMode,
    pub indicator_key: String,
    pub selected: SelectedTarget,
    pub shares: TargetShares,
    pub reason: String,
}

/// Structured provenance attached to every normalized item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRecord {
    pub domain: Domain,

    /// Router rule that matched, for traceability
    pub router: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exempted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyChange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<MagnitudeChange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeChange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<FxExplain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_selection: Option<TargetSelection>,

    pub conversion: ConversionTrace,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality_warnings: Vec<QualityWarning>,
}

impl ExplainRecord {
    pub fn pass_through(domain: Domain, router: &str, summary: String) -> Self {
        Self {
            domain,
            router: router.to_string(),
            exempted: domain == Domain::Exempt,
            currency: None,
            magnitude: None,
            time: None,
            fx: None,
            target_selection: None,
            conversion: ConversionTrace::pass_through(summary),
            quality_warnings: Vec::new(),
        }
    }
}
