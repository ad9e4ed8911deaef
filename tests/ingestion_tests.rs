// Ingress behavior: batch validation, fire-and-forget submission, sample
// trimming at the boundary.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use indicator_ops::dispatch::{PacerConfig, SubmissionPacer};
use indicator_ops::domain::{LlmProvider, Result, SamplePoint};
use indicator_ops::orchestrator::{
    ClassificationOrchestrator, GenerateOptions, LlmCapability, OrchestratorConfig,
    SchemaDescriptor, StageRetryConfig,
};
use indicator_ops::storage::{ClassificationRepository, IndicatorRepository};
use indicator_ops::{
    ClassificationIngress, ClassifyBatchRequest, IndicatorDescriptor, IndicatorOpsError,
    InMemoryClassificationRepository, InMemoryIndicatorRepository, InMemoryStageStore,
    OrchestratorIngress,
};

struct HappyLlm;

#[async_trait::async_trait]
impl LlmCapability for HappyLlm {
    async fn generate_structured(
        &self,
        _prompt: &str,
        schema: &SchemaDescriptor,
        _options: &GenerateOptions,
    ) -> Result<serde_json::Value> {
        let value = match schema.name {
            "unit_normalization" => json!({
                "normalizedScale": "ones",
                "parsedUnitType": "percentage",
                "parsingConfidence": 0.9
            }),
            "time_inference" => json!({
                "reportingFrequency": "monthly",
                "timeBasis": "per-period",
                "sourceUsed": "periodicity",
                "confidence": 0.9,
                "reasoning": "declared monthly"
            }),
            "family_assignment" => json!({
                "family": "numeric-measurement",
                "confidence": 0.9,
                "reasoning": "measured share"
            }),
            "type_classification" => json!({
                "indicatorType": "percentage",
                "temporalAggregation": "period-average",
                "confidence": 0.9,
                "reasoning": "share of labor force"
            }),
            "boolean_review" => json!({
                "isCorrect": true,
                "confidence": 0.9,
                "reasoning": "consistent"
            }),
            other => panic!("unexpected schema {other}"),
        };
        Ok(value)
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Local
    }
}

fn ingress() -> (OrchestratorIngress, Arc<InMemoryClassificationRepository>) {
    let records = Arc::new(InMemoryClassificationRepository::new());
    let orchestrator = Arc::new(ClassificationOrchestrator::new(
        Arc::new(HappyLlm),
        Arc::new(InMemoryStageStore::new()),
        records.clone(),
        Arc::new(SubmissionPacer::new(PacerConfig {
            target_rpm: 600_000.0,
            min_delay: Duration::from_millis(0),
            ..Default::default()
        })),
        OrchestratorConfig {
            retry: StageRetryConfig {
                max_attempts: 1,
                ..Default::default()
            },
            ..Default::default()
        },
    ));
    (OrchestratorIngress::new(orchestrator), records)
}

fn descriptors(count: usize) -> Vec<IndicatorDescriptor> {
    (0..count)
        .map(|i| IndicatorDescriptor::new(format!("ind-{i}"), "Unemployment Rate"))
        .collect()
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let (ingress, _) = ingress();
    let err = ingress
        .submit(ClassifyBatchRequest {
            indicators: descriptors(101),
            llm_provider: LlmProvider::OpenAi,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IndicatorOpsError::Validation { .. }));
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let (ingress, _) = ingress();
    let err = ingress
        .submit(ClassifyBatchRequest {
            indicators: vec![],
            llm_provider: LlmProvider::OpenAi,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IndicatorOpsError::Validation { .. }));
}

#[tokio::test]
async fn accepted_batch_returns_trace_and_classifies_in_background() {
    let (ingress, records) = ingress();
    let response = ingress
        .submit(ClassifyBatchRequest {
            indicators: descriptors(3),
            llm_provider: LlmProvider::Local,
        })
        .await
        .unwrap();

    assert_eq!(response.count, 3);
    assert!(!response.trace_id.is_empty());

    // The workflow runs in the background; poll briefly for completion.
    for _ in 0..50 {
        if records.get("ind-2").await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    for i in 0..3 {
        assert!(
            records.get(&format!("ind-{i}")).await.unwrap().is_some(),
            "ind-{i} not classified"
        );
    }
}

#[tokio::test]
async fn sample_history_is_trimmed_at_the_boundary() {
    let (ingress, records) = ingress();
    let descriptors_repo = Arc::new(InMemoryIndicatorRepository::new());
    let ingress = ingress.with_repository(descriptors_repo.clone());

    let samples: Vec<SamplePoint> = (0..120u32)
        .map(|i| SamplePoint {
            date: chrono::NaiveDate::from_ymd_opt(2020 + (i / 12) as i32, (i % 12) + 1, 15)
                .unwrap(),
            value: i as f64,
        })
        .collect();
    let descriptor = IndicatorDescriptor::new("sampled", "Unemployment Rate").with_samples(samples);

    ingress
        .submit(ClassifyBatchRequest {
            indicators: vec![descriptor],
            llm_provider: LlmProvider::Local,
        })
        .await
        .unwrap();

    // The persisted descriptor carries only the most recent 50 observations
    let stored = descriptors_repo.get("sampled").await.unwrap().unwrap();
    assert_eq!(stored.sample_values.len(), 50);
    let oldest_kept = stored.sample_values.iter().map(|s| s.date).min().unwrap();
    assert!(oldest_kept > chrono::NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());

    for _ in 0..50 {
        if records.get("sampled").await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(records.get("sampled").await.unwrap().is_some());
}
