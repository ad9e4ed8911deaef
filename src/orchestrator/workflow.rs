//! The durable classification workflow.
//!
//! Per indicator the six stages run strictly in order; every stage result is
//! persisted under `(indicator_id, stage)` before the pipeline advances, so a
//! crash resumes at the first unpersisted stage without re-calling the LLM
//! for anything already done. Indicators fan out concurrently up to the
//! configured limit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::dispatch::SubmissionPacer;
use crate::domain::{
    ClassificationRecord, IndicatorDescriptor, IndicatorOpsError, Result, StageName, StagePayload,
    StageResult,
};
use crate::storage::{ClassificationRepository, StageFailureRecord, StageStore};

use super::llm::{GenerateOptions, LlmCapability};
use super::schema::{SchemaDescriptor, SchemaResult};
use super::stages::{self, StageContext};
use super::state::IndicatorState;

/// Retry budget for one stage's LLM call.
///
/// A stage attempt can fail three ways, and they back off differently: a 429
/// waits out the pacer's cooldown, schema/transport/timeout failures wait a
/// doubling delay, and anything else fails the indicator immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageRetryConfig {
    /// Attempts per stage before the indicator is marked failed
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles on each further failure
    pub base_delay: Duration,

    pub max_delay: Duration,
}

impl Default for StageRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl StageRetryConfig {
    /// Delay before the next attempt. Shaves off up to a quarter at random so
    /// concurrent indicators do not retry in lockstep.
    fn delay_for(&self, failed_attempts: u32) -> Duration {
        let doublings = failed_attempts.saturating_sub(1).min(10);
        let capped = self
            .base_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay);
        let shave_ms = (capped.as_millis() / 4) as u64;
        if shave_ms == 0 {
            return capped;
        }
        use rand::Rng;
        capped - Duration::from_millis(rand::thread_rng().gen_range(0..=shave_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Indicators processed simultaneously
    pub max_concurrent_indicators: usize,

    /// Overall confidence below which the final review always runs
    pub final_review_threshold: f64,

    pub retry: StageRetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_indicators: 4,
            final_review_threshold: 0.7,
            retry: StageRetryConfig::default(),
        }
    }
}

/// Outcome of a batch run. Per-indicator failures never fail the batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct ClassificationOrchestrator {
    llm: Arc<dyn LlmCapability>,
    stages: Arc<dyn StageStore>,
    records: Arc<dyn ClassificationRepository>,
    pacer: Arc<SubmissionPacer>,
    config: OrchestratorConfig,
}

impl ClassificationOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmCapability>,
        stages: Arc<dyn StageStore>,
        records: Arc<dyn ClassificationRepository>,
        pacer: Arc<SubmissionPacer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            llm,
            stages,
            records,
            pacer,
            config,
        }
    }

    /// Classify one indicator with durable, resumable semantics.
    ///
    /// Without `force`, an indicator that already has a classification record
    /// is a no-op and the stored record is returned unchanged. With `force`,
    /// prior stage results and the record are deleted before restarting.
    #[instrument(skip(self, descriptor), fields(indicator_id = %descriptor.id))]
    pub async fn classify(
        &self,
        descriptor: IndicatorDescriptor,
        force: bool,
    ) -> Result<ClassificationRecord> {
        descriptor.validate()?;
        let id = descriptor.id.clone();

        if force {
            info!("force flag set; clearing prior stage results");
            self.records.delete(&id).await?;
            self.stages.delete_for(&id).await?;
        } else if let Some(existing) = self.records.get(&id).await? {
            info!("indicator already classified; returning stored record");
            return Ok(existing);
        }

        let mut state = IndicatorState::New;
        let mut ctx = StageContext::default();

        let payload = self
            .run_stage(&descriptor, StageName::Normalization, &mut state, &ctx)
            .await?;
        let StagePayload::Normalization(normalized) = payload else {
            return Err(IndicatorOpsError::internal("normalization stage payload mismatch"));
        };
        ctx.normalized = Some(normalized.clone());

        let payload = self
            .run_stage(&descriptor, StageName::Time, &mut state, &ctx)
            .await?;
        let StagePayload::Time(time) = payload else {
            return Err(IndicatorOpsError::internal("time stage payload mismatch"));
        };
        ctx.time = Some(time.clone());

        let payload = self
            .run_stage(&descriptor, StageName::Family, &mut state, &ctx)
            .await?;
        let StagePayload::Family(family) = payload else {
            return Err(IndicatorOpsError::internal("family stage payload mismatch"));
        };
        ctx.family = Some(family.clone());

        let payload = self
            .run_stage(&descriptor, StageName::Type, &mut state, &ctx)
            .await?;
        let StagePayload::Type(type_result) = payload else {
            return Err(IndicatorOpsError::internal("type stage payload mismatch"));
        };
        ctx.type_result = Some(type_result.clone());

        let payload = self
            .run_stage(&descriptor, StageName::Review, &mut state, &ctx)
            .await?;
        let StagePayload::Review(review) = payload else {
            return Err(IndicatorOpsError::internal("review stage payload mismatch"));
        };
        ctx.review = Some(review.clone());

        let min_confidence = [
            normalized.parsing_confidence,
            time.confidence,
            family.confidence,
            type_result.confidence,
            review.confidence,
        ]
        .into_iter()
        .fold(1.0_f64, f64::min);

        let final_review = if !review.is_correct
            || min_confidence < self.config.final_review_threshold
        {
            let payload = self
                .run_stage(&descriptor, StageName::Final, &mut state, &ctx)
                .await?;
            let StagePayload::Final(final_review) = payload else {
                return Err(IndicatorOpsError::internal("final stage payload mismatch"));
            };
            Some(final_review)
        } else {
            None
        };

        state.advance(IndicatorState::Completed)?;

        let overall_confidence = ClassificationRecord::overall_confidence(
            &normalized,
            &time,
            &family,
            &type_result,
            &review,
            final_review.as_ref(),
        );

        let record = ClassificationRecord {
            indicator_id: id.clone(),
            normalized,
            time,
            family,
            type_result,
            review,
            final_review,
            overall_confidence,
            created_at: Utc::now(),
        };
        self.records.upsert(&record).await?;
        metrics::counter!("indicator_ops_classifications_completed", 1);
        info!(overall_confidence, "classification record written");
        Ok(record)
    }

    /// Classify many indicators with bounded fan-out. Stage failures are
    /// isolated: the batch always runs to completion.
    pub async fn classify_batch(
        &self,
        descriptors: Vec<IndicatorDescriptor>,
        force: bool,
    ) -> BatchReport {
        let outcomes: Vec<(String, Result<ClassificationRecord>)> = stream::iter(descriptors)
            .map(|descriptor| async move {
                let id = descriptor.id.clone();
                (id, self.classify(descriptor, force).await)
            })
            .buffer_unordered(self.config.max_concurrent_indicators.max(1))
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(_) => report.completed.push(id),
                Err(err) => {
                    error!(indicator_id = %id, error = %err, "indicator failed");
                    report.failed.push((id, err.to_string()));
                }
            }
        }
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "classification batch finished"
        );
        report
    }

    /// Durable step execution: a persisted result short-circuits the stage;
    /// otherwise the LLM call runs (through the pacer) with schema-validation
    /// retries, and the result is persisted before the stage is considered
    /// done.
    async fn run_stage(
        &self,
        descriptor: &IndicatorDescriptor,
        stage: StageName,
        state: &mut IndicatorState,
        ctx: &StageContext,
    ) -> Result<StagePayload> {
        state.advance(IndicatorState::for_stage(stage))?;

        if let Some(existing) = self.stages.get(&descriptor.id, stage).await? {
            info!(stage = %stage, "stage result already persisted; skipping");
            return Ok(existing.payload);
        }

        let prompt = build_prompt(stage, descriptor, ctx);
        let schema = stages::schema_for(stage);
        let options = GenerateOptions::for_provider(self.llm.provider());

        let mut attempts = 0u32;
        let outcome = loop {
            attempts += 1;
            match self.attempt_stage(&prompt, stage, schema, &options).await {
                Ok(parsed) => {
                    if attempts > 1 {
                        info!(stage = %stage, attempts, "stage succeeded after retry");
                    }
                    self.pacer.on_success().await;
                    break Ok(parsed);
                }
                Err(IndicatorOpsError::RateLimited { .. })
                    if attempts < self.config.retry.max_attempts =>
                {
                    // 429 is a global signal: wait out the pacer's cooldown
                    // (which also halves the rate when it persists), then
                    // re-run the same stage.
                    let cooldown = self.pacer.on_rate_limited().await;
                    warn!(
                        stage = %stage,
                        attempts,
                        cooldown_secs = cooldown.as_secs(),
                        "stage rate limited; cooling down"
                    );
                    sleep(cooldown).await;
                }
                Err(err) if err.is_retryable() && attempts < self.config.retry.max_attempts => {
                    let delay = self.config.retry.delay_for(attempts);
                    warn!(
                        stage = %stage,
                        attempts,
                        max_attempts = self.config.retry.max_attempts,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "stage attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok((payload, confidence, reasoning)) => {
                let result = StageResult::new(
                    descriptor.id.clone(),
                    payload,
                    confidence,
                    reasoning,
                    self.llm.provider(),
                );
                let inserted = self.stages.put(&result).await?;
                if !inserted {
                    // A concurrent writer won the key; their result is the
                    // durable one.
                    if let Some(existing) = self.stages.get(&descriptor.id, stage).await? {
                        return Ok(existing.payload);
                    }
                }
                metrics::counter!("indicator_ops_stages_completed", 1, "stage" => stage.as_str());
                Ok(result.payload)
            }
            Err(err) => {
                warn!(stage = %stage, error = %err, "stage failed after retries");
                let failure = StageFailureRecord::new(
                    descriptor.id.clone(),
                    stage,
                    err.to_string(),
                );
                self.stages.record_failure(&failure).await?;
                *state = IndicatorState::Failed;
                metrics::counter!("indicator_ops_stages_failed", 1, "stage" => stage.as_str());
                Err(IndicatorOpsError::stage_failure(
                    descriptor.id.clone(),
                    stage.as_str(),
                    err.to_string(),
                ))
            }
        }
    }

    /// One stage attempt: pace the call, run it under the provider timeout,
    /// validate the response against the stage schema.
    async fn attempt_stage(
        &self,
        prompt: &str,
        stage: StageName,
        schema: &SchemaDescriptor,
        options: &GenerateOptions,
    ) -> Result<(StagePayload, f64, String)> {
        self.pacer.acquire(1).await;
        let call = self.llm.generate_structured(prompt, schema, options);
        let raw = tokio::time::timeout(options.timeout, call)
            .await
            .map_err(|_| IndicatorOpsError::Timeout {
                operation: format!("{stage} stage LLM call"),
            })??;
        parse_payload(stage, &raw).map_err(|e| IndicatorOpsError::SchemaValidation {
            stage: stage.as_str().to_string(),
            path: e.path,
            reason: e.reason,
        })
    }
}

fn build_prompt(stage: StageName, descriptor: &IndicatorDescriptor, ctx: &StageContext) -> String {
    match stage {
        StageName::Normalization => stages::normalization_prompt(descriptor),
        StageName::Time => stages::time_prompt(descriptor, ctx),
        StageName::Family => stages::family_prompt(descriptor, ctx),
        StageName::Type => stages::type_prompt(descriptor, ctx),
        StageName::Review => stages::review_prompt(descriptor, ctx),
        StageName::Final => stages::final_prompt(descriptor, ctx),
    }
}

/// Stage-specific parse plus the (confidence, reasoning) pair every stage
/// result carries.
fn parse_payload(stage: StageName, value: &Value) -> SchemaResult<(StagePayload, f64, String)> {
    match stage {
        StageName::Normalization => {
            let payload = stages::parse_normalization(value)?;
            let confidence = payload.parsing_confidence;
            let reasoning = payload.matched_pattern.clone().unwrap_or_default();
            Ok((StagePayload::Normalization(payload), confidence, reasoning))
        }
        StageName::Time => {
            let payload = stages::parse_time(value)?;
            let (confidence, reasoning) = (payload.confidence, payload.reasoning.clone());
            Ok((StagePayload::Time(payload), confidence, reasoning))
        }
        StageName::Family => {
            let payload = stages::parse_family(value)?;
            let (confidence, reasoning) = (payload.confidence, payload.reasoning.clone());
            Ok((StagePayload::Family(payload), confidence, reasoning))
        }
        StageName::Type => {
            let payload = stages::parse_type(value)?;
            let (confidence, reasoning) = (payload.confidence, payload.reasoning.clone());
            Ok((StagePayload::Type(payload), confidence, reasoning))
        }
        StageName::Review => {
            let payload = stages::parse_review(value)?;
            let (confidence, reasoning) = (payload.confidence, payload.reasoning.clone());
            Ok((StagePayload::Review(payload), confidence, reasoning))
        }
        StageName::Final => {
            let payload = stages::parse_final(value)?;
            let (confidence, reasoning) = (payload.confidence, payload.final_reasoning.clone());
            Ok((StagePayload::Final(payload), confidence, reasoning))
        }
    }
}
