//! Client-side batch dispatcher: round-robin across backend endpoints with
//! per-attempt timeout and failover.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{IndicatorDescriptor, IndicatorOpsError, LlmProvider, Result};

/// One classification batch headed for a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubmission {
    pub indicators: Vec<IndicatorDescriptor>,
    pub llm_provider: LlmProvider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAck {
    pub trace_id: String,
    pub count: usize,
}

#[async_trait::async_trait]
pub trait BatchTransport: Send + Sync {
    async fn send(&self, endpoint: &str, submission: &BatchSubmission) -> Result<SubmissionAck>;
}

/// HTTP transport posting to `{endpoint}/classify/batch`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| IndicatorOpsError::internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[derive(Serialize)]
struct WireBatch<'a> {
    indicators: &'a [IndicatorDescriptor],
    llm_provider: LlmProvider,
}

#[derive(Deserialize)]
struct WireAck {
    trace_id: String,
    count: usize,
}

#[async_trait::async_trait]
impl BatchTransport for HttpTransport {
    async fn send(&self, endpoint: &str, submission: &BatchSubmission) -> Result<SubmissionAck> {
        let url = format!("{}/classify/batch", endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&WireBatch {
                indicators: &submission.indicators,
                llm_provider: submission.llm_provider,
            })
            .send()
            .await
            .map_err(|e| IndicatorOpsError::transport(endpoint, e.to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(IndicatorOpsError::RateLimited { retry_after_secs: 60 });
        }
        if !response.status().is_success() {
            return Err(IndicatorOpsError::transport(
                endpoint,
                format!("status {}", response.status()),
            ));
        }
        let ack: WireAck = response
            .json()
            .await
            .map_err(|e| IndicatorOpsError::transport(endpoint, e.to_string()))?;
        Ok(SubmissionAck {
            trace_id: ack.trace_id,
            count: ack.count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatcherConfig {
    pub endpoints: Vec<String>,
    pub attempt_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:8080".to_string()],
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Default)]
struct EndpointCounters {
    submitted: AtomicU64,
    failed: AtomicU64,
}

/// Observed traffic per endpoint, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReport {
    pub endpoint: String,
    pub submitted: u64,
    pub failed: u64,
}

pub struct Dispatcher {
    config: DispatcherConfig,
    transport: std::sync::Arc<dyn BatchTransport>,
    cursor: Mutex<u64>,
    counters: Vec<EndpointCounters>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        transport: std::sync::Arc<dyn BatchTransport>,
    ) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(IndicatorOpsError::config("dispatcher needs at least one endpoint"));
        }
        let counters = config.endpoints.iter().map(|_| EndpointCounters::default()).collect();
        Ok(Self {
            config,
            transport,
            cursor: Mutex::new(0),
            counters,
        })
    }

    /// Monotonically increasing attempt cursor; callers observe it modulo the
    /// endpoint count.
    pub fn cursor(&self) -> u64 {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_endpoint(&self) -> usize {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let index = (*cursor % self.config.endpoints.len() as u64) as usize;
        *cursor += 1;
        index
    }

    /// Submit one batch, failing over across endpoints. Exactly one network
    /// call on success at the first endpoint; at most N calls total.
    pub async fn submit(&self, submission: &BatchSubmission) -> Result<SubmissionAck> {
        let attempts = self.config.endpoints.len();
        let mut last_error: Option<IndicatorOpsError> = None;

        for attempt in 1..=attempts {
            let index = self.next_endpoint();
            let endpoint = &self.config.endpoints[index];
            self.counters[index].submitted.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("indicator_ops_dispatch_attempts", 1, "endpoint" => endpoint.clone());

            let send = self.transport.send(endpoint, submission);
            let outcome = tokio::time::timeout(self.config.attempt_timeout, send).await;

            match outcome {
                Ok(Ok(ack)) => {
                    info!(
                        endpoint = %endpoint,
                        trace_id = %ack.trace_id,
                        count = ack.count,
                        "batch submitted"
                    );
                    return Ok(ack);
                }
                Ok(Err(err @ IndicatorOpsError::RateLimited { .. })) => {
                    // Rate limiting is a global signal, not an endpoint fault:
                    // surface it without burning the remaining endpoints.
                    self.counters[index].failed.fetch_add(1, Ordering::Relaxed);
                    return Err(err);
                }
                Ok(Err(err)) => {
                    self.counters[index].failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        endpoint = %endpoint,
                        attempt,
                        attempts,
                        error = %err,
                        "submission failed; failing over"
                    );
                    last_error = Some(err);
                }
                Err(_) => {
                    self.counters[index].failed.fetch_add(1, Ordering::Relaxed);
                    warn!(endpoint = %endpoint, attempt, attempts, "submission timed out");
                    last_error = Some(IndicatorOpsError::Timeout {
                        operation: format!("submit to {endpoint}"),
                    });
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| IndicatorOpsError::internal("dispatcher had no endpoints")))
    }

    pub fn endpoint_reports(&self) -> Vec<EndpointReport> {
        self.config
            .endpoints
            .iter()
            .zip(&self.counters)
            .map(|(endpoint, counters)| EndpointReport {
                endpoint: endpoint.clone(),
                submitted: counters.submitted.load(Ordering::Relaxed),
                failed: counters.failed.load(Ordering::Relaxed),
            })
            .collect()
    }
}
