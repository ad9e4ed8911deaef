//! Ingress handling: validate a batch, fire the workflow, return a trace id.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{IndicatorOpsError, Result};
use crate::orchestrator::ClassificationOrchestrator;
use crate::storage::IndicatorRepository;

use super::models::{ClassifyBatchRequest, ClassifyBatchResponse, MAX_BATCH_SIZE};

#[async_trait::async_trait]
pub trait ClassificationIngress: Send + Sync {
    async fn submit(&self, request: ClassifyBatchRequest) -> Result<ClassifyBatchResponse>;
}

/// Fire-and-forget ingress over the orchestrator: the workflow runs in the
/// background and the caller gets a trace id immediately.
pub struct OrchestratorIngress {
    orchestrator: Arc<ClassificationOrchestrator>,
    descriptors: Option<Arc<dyn IndicatorRepository>>,
}

impl OrchestratorIngress {
    pub fn new(orchestrator: Arc<ClassificationOrchestrator>) -> Self {
        Self {
            orchestrator,
            descriptors: None,
        }
    }

    /// Persist accepted descriptors so reruns and audits can read back what
    /// was ingested.
    pub fn with_repository(mut self, descriptors: Arc<dyn IndicatorRepository>) -> Self {
        self.descriptors = Some(descriptors);
        self
    }
}

#[async_trait::async_trait]
impl ClassificationIngress for OrchestratorIngress {
    async fn submit(&self, request: ClassifyBatchRequest) -> Result<ClassifyBatchResponse> {
        if request.indicators.is_empty() {
            return Err(IndicatorOpsError::validation("<batch>", "batch is empty"));
        }
        if request.indicators.len() > MAX_BATCH_SIZE {
            return Err(IndicatorOpsError::validation(
                "<batch>",
                format!(
                    "batch size {} exceeds the {MAX_BATCH_SIZE} limit",
                    request.indicators.len()
                ),
            ));
        }

        // Sample history is capped here, at the ingest boundary; descriptors
        // are read-only afterwards.
        let mut descriptors = request.indicators;
        for descriptor in &mut descriptors {
            descriptor.validate()?;
            descriptor.trim_samples();
        }

        if let Some(repository) = &self.descriptors {
            for descriptor in &descriptors {
                repository.upsert(descriptor).await?;
            }
        }

        let trace_id = Uuid::new_v4().to_string();
        let count = descriptors.len();
        info!(
            trace_id = %trace_id,
            count,
            provider = %request.llm_provider,
            "classification batch accepted"
        );

        let orchestrator = self.orchestrator.clone();
        let task_trace = trace_id.clone();
        tokio::spawn(async move {
            let report = orchestrator.classify_batch(descriptors, false).await;
            if !report.failed.is_empty() {
                warn!(
                    trace_id = %task_trace,
                    failed = report.failed.len(),
                    "batch finished with failures"
                );
            }
        });

        Ok(ClassifyBatchResponse { trace_id, count })
    }
}
