// Classification orchestrator: durable six-stage workflow over the LLM
// capability, with schema-validated outputs and write-once stage persistence.

pub mod llm;
pub mod schema;
pub mod stages;
pub mod state;
pub mod workflow;

pub use llm::{GenerateOptions, LlmCapability};
pub use schema::{SchemaDescriptor, SchemaError, SchemaResult};
pub use stages::StageContext;
pub use state::IndicatorState;
pub use workflow::{
    BatchReport, ClassificationOrchestrator, OrchestratorConfig, StageRetryConfig,
};
