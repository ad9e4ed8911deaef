use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ClassificationRecord, IndicatorDescriptor, Result, StageName, StageResult};

/// Terminal failure marker for one indicator's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailureRecord {
    pub indicator_id: String,
    pub stage: StageName,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl StageFailureRecord {
    pub fn new(indicator_id: String, stage: StageName, reason: String) -> Self {
        Self {
            indicator_id,
            stage,
            reason,
            created_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait IndicatorRepository: Send + Sync {
    async fn upsert(&self, descriptor: &IndicatorDescriptor) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<IndicatorDescriptor>>;
    async fn list_ids(&self) -> Result<Vec<String>>;
}

/// Durable stage-result store.
///
/// `put` is write-once: a result already persisted under the same
/// `(indicator_id, stage)` key is kept and `Ok(false)` is returned.
/// Concurrent writers for the same key serialize inside the store.
#[async_trait::async_trait]
pub trait StageStore: Send + Sync {
    async fn put(&self, result: &StageResult) -> Result<bool>;
    async fn get(&self, indicator_id: &str, stage: StageName) -> Result<Option<StageResult>>;
    /// Force-reclassify support: drop every stage result for the indicator.
    async fn delete_for(&self, indicator_id: &str) -> Result<()>;
    async fn record_failure(&self, failure: &StageFailureRecord) -> Result<()>;
    async fn get_failure(&self, indicator_id: &str) -> Result<Option<StageFailureRecord>>;
}

#[async_trait::async_trait]
pub trait ClassificationRepository: Send + Sync {
    /// Atomic insert-or-replace.
    async fn upsert(&self, record: &ClassificationRecord) -> Result<()>;
    async fn get(&self, indicator_id: &str) -> Result<Option<ClassificationRecord>>;
    async fn delete(&self, indicator_id: &str) -> Result<()>;
}
