use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::LlmProvider;
use super::vocab::{
    IndicatorFamily, IndicatorType, Magnitude, ReportingFrequency, TemporalAggregation, TimeBasis,
    TimeSource, UnitSemanticType,
};

/// The six classification stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Normalization,
    Time,
    Family,
    Type,
    Review,
    Final,
}

impl StageName {
    pub const PIPELINE: [StageName; 6] = [
        StageName::Normalization,
        StageName::Time,
        StageName::Family,
        StageName::Type,
        StageName::Review,
        StageName::Final,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Normalization => "normalization",
            StageName::Time => "time",
            StageName::Family => "family",
            StageName::Type => "type",
            StageName::Review => "review",
            StageName::Final => "final",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage 1 output: unit/scale/currency inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_units: Option<String>,

    /// Scale hint as written by the source, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_scale: Option<String>,

    /// Scale resolved to a standard tier
    pub normalized_scale: Magnitude,

    pub parsed_unit_type: UnitSemanticType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_currency: Option<String>,

    pub parsing_confidence: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

/// Stage 2 output: reporting frequency and time basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInferenceResult {
    pub reporting_frequency: ReportingFrequency,
    pub time_basis: TimeBasis,
    pub source_used: TimeSource,
    pub confidence: f64,
    pub reasoning: String,
}

/// Stage 3 output: indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyResult {
    pub family: IndicatorFamily,
    pub confidence: f64,
    pub reasoning: String,
}

/// Stage 4 output: fine-grained type plus temporal aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeResult {
    pub indicator_type: IndicatorType,
    pub temporal_aggregation: TemporalAggregation,
    pub confidence: f64,
    pub reasoning: String,
}

/// Stage 5 output: boolean consistency review over stages 1-4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanReviewResult {
    pub is_correct: bool,
    #[serde(default)]
    pub incorrect_fields: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
}

/// Stage 6 output: conditional deep review with corrections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReviewResult {
    pub review_makes_sense: bool,
    /// Field name -> corrected value, for fields the review amended
    #[serde(default)]
    pub corrections_applied: BTreeMap<String, String>,
    pub final_reasoning: String,
    pub confidence: f64,
}

/// Stage-specific payload, tagged for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StagePayload {
    Normalization(NormalizationResult),
    Time(TimeInferenceResult),
    Family(FamilyResult),
    Type(TypeResult),
    Review(BooleanReviewResult),
    Final(FinalReviewResult),
}

impl StagePayload {
    pub fn stage(&self) -> StageName {
        match self {
            StagePayload::Normalization(_) => StageName::Normalization,
            StagePayload::Time(_) => StageName::Time,
            StagePayload::Family(_) => StageName::Family,
            StagePayload::Type(_) => StageName::Type,
            StagePayload::Review(_) => StageName::Review,
            StagePayload::Final(_) => StageName::Final,
        }
    }
}

/// One persisted stage execution.
///
/// Written once under `(indicator_id, stage)` before the next stage starts;
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage: StageName,
    pub indicator_id: String,
    pub payload: StagePayload,
    pub confidence: f64,
    pub reasoning: String,
    pub llm_provider: LlmProvider,
    pub created_at: DateTime<Utc>,
}

impl StageResult {
    pub fn new(
        indicator_id: String,
        payload: StagePayload,
        confidence: f64,
        reasoning: String,
        llm_provider: LlmProvider,
    ) -> Self {
        Self {
            stage: payload.stage(),
            indicator_id,
            payload,
            confidence,
            reasoning,
            llm_provider,
            created_at: Utc::now(),
        }
    }
}

/// Consolidated output of the classification pipeline for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub indicator_id: String,
    pub normalized: NormalizationResult,
    pub time: TimeInferenceResult,
    pub family: FamilyResult,
    #[serde(rename = "type")]
    pub type_result: TypeResult,
    pub review: BooleanReviewResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_review: Option<FinalReviewResult>,
    pub overall_confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl ClassificationRecord {
    /// Overall confidence is the minimum of stage confidences unless the
    /// final review explicitly overrides it with its own.
    pub fn overall_confidence(
        normalized: &NormalizationResult,
        time: &TimeInferenceResult,
        family: &FamilyResult,
        type_result: &TypeResult,
        review: &BooleanReviewResult,
        final_review: Option<&FinalReviewResult>,
    ) -> f64 {
        if let Some(fr) = final_review {
            if fr.review_makes_sense {
                return fr.confidence;
            }
        }
        [
            normalized.parsing_confidence,
            time.confidence,
            family.confidence,
            type_result.confidence,
            review.confidence,
        ]
        .into_iter()
        .fold(1.0_f64, f64::min)
    }
}
