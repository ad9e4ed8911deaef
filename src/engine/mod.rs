// Normalization engine: domain router, per-domain pipelines, auto-target
// derivation, and quality annotations.

pub mod options;
pub mod pipeline;
pub mod processor;
pub mod quality;
pub mod router;
pub mod target;

pub use options::{
    CurrencyTieBreaker, ErrorHandling, Exemptions, MagnitudeTieBreaker, NormalizationOptions,
    QualityConfig, SpecialHandling, TargetDimension, TieBreakers, TimeTieBreaker, UnitOverride,
};
pub use pipeline::{ConversionContext, EffectiveTarget, SourceDims};
pub use processor::{BatchSession, EngineWarning, NormalizationEngine, ProcessMetrics, ProcessOutcome};
pub use quality::{GroupQuality, QualityAssessment};
pub use router::{route, RouteDecision};
pub use target::select_target;
