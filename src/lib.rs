//! indicator-ops - classification and normalization platform for economic
//! indicator metadata.
//!
//! Two subsystems, coupled only through a data handoff: a durable,
//! rate-limited classification orchestrator that routes each indicator
//! through LLM-assisted stages, and a normalization engine that converts
//! classified data points to a common currency, magnitude, and time basis
//! (or deliberately leaves them alone when conversion is meaningless).

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod observability;
pub mod orchestrator;
pub mod storage;
pub mod units;

// Re-export commonly used types
pub use domain::{
    ClassificationRecord, DataPoint, Domain, ExplainRecord, IndicatorDescriptor,
    IndicatorOpsError, IndicatorType, LlmProvider, Magnitude, NormalizedDataPoint, Result,
    StageName, StageResult, TimeScale, UnitSemanticType,
};

pub use convert::{FxConverter, FxTable};

pub use engine::{BatchSession, NormalizationEngine, NormalizationOptions, ProcessOutcome};

pub use orchestrator::{
    ClassificationOrchestrator, GenerateOptions, LlmCapability, OrchestratorConfig,
    SchemaDescriptor,
};

pub use dispatch::{BatchTransport, Dispatcher, DispatcherConfig, PacerConfig, SubmissionPacer};

pub use ingestion::{
    create_router, start_server, ClassificationIngress, ClassifyBatchRequest,
    ClassifyBatchResponse, OrchestratorIngress,
};

pub use storage::{
    ClassificationRepository, IndicatorRepository, InMemoryClassificationRepository,
    InMemoryIndicatorRepository, InMemoryStageStore, SqliteStores, StageStore,
};

pub use config::ServiceConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default configuration
pub fn init() -> Result<()> {
    observability::init_tracing();
    Ok(())
}
