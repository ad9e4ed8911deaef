use serde::{Deserialize, Serialize};

use crate::domain::{IndicatorDescriptor, LlmProvider};

/// Hard cap on indicators per submission.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyBatchRequest {
    pub indicators: Vec<IndicatorDescriptor>,
    pub llm_provider: LlmProvider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyBatchResponse {
    pub trace_id: String,
    pub count: usize,
}
