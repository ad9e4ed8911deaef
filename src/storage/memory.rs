//! In-memory stores for tests and single-process runs.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{ClassificationRecord, IndicatorDescriptor, Result, StageName, StageResult};

use super::repository::{
    ClassificationRepository, IndicatorRepository, StageFailureRecord, StageStore,
};

#[derive(Default)]
pub struct InMemoryIndicatorRepository {
    descriptors: RwLock<HashMap<String, IndicatorDescriptor>>,
}

impl InMemoryIndicatorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IndicatorRepository for InMemoryIndicatorRepository {
    async fn upsert(&self, descriptor: &IndicatorDescriptor) -> Result<()> {
        let mut descriptors = self.descriptors.write().await;
        descriptors.insert(descriptor.id.clone(), descriptor.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<IndicatorDescriptor>> {
        let descriptors = self.descriptors.read().await;
        Ok(descriptors.get(id).cloned())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let descriptors = self.descriptors.read().await;
        let mut ids: Vec<String> = descriptors.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default)]
pub struct InMemoryStageStore {
    results: RwLock<HashMap<(String, StageName), StageResult>>,
    failures: RwLock<HashMap<String, StageFailureRecord>>,
}

impl InMemoryStageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted stage results, for tests.
    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl StageStore for InMemoryStageStore {
    async fn put(&self, result: &StageResult) -> Result<bool> {
        let mut results = self.results.write().await;
        let key = (result.indicator_id.clone(), result.stage);
        if results.contains_key(&key) {
            debug!(
                indicator_id = %result.indicator_id,
                stage = %result.stage,
                "stage result already persisted; keeping existing"
            );
            return Ok(false);
        }
        results.insert(key, result.clone());
        Ok(true)
    }

    async fn get(&self, indicator_id: &str, stage: StageName) -> Result<Option<StageResult>> {
        let results = self.results.read().await;
        Ok(results.get(&(indicator_id.to_string(), stage)).cloned())
    }

    async fn delete_for(&self, indicator_id: &str) -> Result<()> {
        let mut results = self.results.write().await;
        results.retain(|(id, _), _| id != indicator_id);
        let mut failures = self.failures.write().await;
        failures.remove(indicator_id);
        Ok(())
    }

    async fn record_failure(&self, failure: &StageFailureRecord) -> Result<()> {
        let mut failures = self.failures.write().await;
        failures.insert(failure.indicator_id.clone(), failure.clone());
        Ok(())
    }

    async fn get_failure(&self, indicator_id: &str) -> Result<Option<StageFailureRecord>> {
        let failures = self.failures.read().await;
        Ok(failures.get(indicator_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryClassificationRepository {
    records: RwLock<HashMap<String, ClassificationRecord>>,
}

impl InMemoryClassificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ClassificationRepository for InMemoryClassificationRepository {
    async fn upsert(&self, record: &ClassificationRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.indicator_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, indicator_id: &str) -> Result<Option<ClassificationRecord>> {
        let records = self.records.read().await;
        Ok(records.get(indicator_id).cloned())
    }

    async fn delete(&self, indicator_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(indicator_id);
        Ok(())
    }
}
