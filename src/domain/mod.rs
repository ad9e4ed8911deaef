// Core domain models for indicator-ops

pub mod classification;
pub mod datapoint;
pub mod error;
pub mod explain;
pub mod indicator;
pub mod provider;
pub mod vocab;

pub use classification::{
    BooleanReviewResult, ClassificationRecord, FamilyResult, FinalReviewResult,
    NormalizationResult, StageName, StagePayload, StageResult, TimeInferenceResult, TypeResult,
};
pub use datapoint::{DataPoint, NormalizedDataPoint};
pub use error::{IndicatorOpsError, Result};
pub use explain::{
    ConversionStep, ConversionTrace, CurrencyChange, Domain, ExplainRecord, FxExplain, FxSource,
    MagnitudeChange, QualityWarning, QualityWarningKind, SelectedTarget, TargetMode,
    TargetSelection, TargetShares, TimeChange,
};
pub use indicator::{IndicatorDescriptor, SamplePoint};
pub use provider::LlmProvider;
pub use vocab::{
    IndicatorFamily, IndicatorType, Magnitude, ReportingFrequency, TemporalAggregation, TimeBasis,
    TimeScale, TimeSource, UnitCategory, UnitSemanticType,
};
