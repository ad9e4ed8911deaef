//! Submission pacing toward a target requests-per-minute.
//!
//! The release gate serializes all submitters on one mutex: the next batch is
//! released no earlier than `last_release + delay`. A 429 triggers a cooldown
//! and, when it persists, halves the rate for the remainder of the run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PacerConfig {
    /// Target LLM requests per minute across the whole run
    pub target_rpm: f64,

    /// Estimated LLM requests needed per indicator (six stages)
    pub estimated_requests_per_indicator: f64,

    /// Floor on the inter-batch delay
    pub min_delay: Duration,

    /// Pause after a rate-limit signal
    pub cooldown: Duration,

    /// Consecutive rate-limit signals before the rate is halved
    pub halve_after: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            target_rpm: 60.0,
            estimated_requests_per_indicator: 6.0,
            min_delay: Duration::from_millis(250),
            cooldown: Duration::from_secs(60),
            halve_after: 2,
        }
    }
}

#[derive(Debug)]
struct PacerState {
    last_release: Option<Instant>,
    rpm: f64,
    consecutive_rate_limits: u32,
}

pub struct SubmissionPacer {
    config: PacerConfig,
    state: Mutex<PacerState>,
}

impl SubmissionPacer {
    pub fn new(config: PacerConfig) -> Self {
        let rpm = config.target_rpm;
        Self {
            config,
            state: Mutex::new(PacerState {
                last_release: None,
                rpm,
                consecutive_rate_limits: 0,
            }),
        }
    }

    fn delay_for(&self, rpm: f64, batch_size: usize) -> Duration {
        let indicators_per_minute = (rpm / self.config.estimated_requests_per_indicator).max(0.01);
        let delay = Duration::from_secs_f64(batch_size as f64 / indicators_per_minute * 60.0);
        delay.max(self.config.min_delay)
    }

    /// Block until the batch may be released. Submitters serialize here.
    pub async fn acquire(&self, batch_size: usize) {
        let mut state = self.state.lock().await;
        if let Some(last) = state.last_release {
            let delay = self.delay_for(state.rpm, batch_size);
            let elapsed = last.elapsed();
            if elapsed < delay {
                let wait = delay - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "pacer holding batch");
                metrics::histogram!(
                    "indicator_ops_pacer_wait_ms",
                    wait.as_millis() as f64
                );
                sleep(wait).await;
            }
        }
        state.last_release = Some(Instant::now());
    }

    /// Record a 429. Returns how long the caller must cool down before
    /// retrying the same batch.
    pub async fn on_rate_limited(&self) -> Duration {
        let mut state = self.state.lock().await;
        state.consecutive_rate_limits += 1;
        metrics::counter!("indicator_ops_rate_limit_signals", 1);
        if state.consecutive_rate_limits >= self.config.halve_after {
            state.rpm = (state.rpm / 2.0).max(1.0);
            warn!(rpm = state.rpm, "persistent rate limiting; rate halved for this run");
        }
        self.config.cooldown
    }

    /// A successful submission ends the current rate-limit streak. The rate
    /// itself stays reduced for the remainder of the run.
    pub async fn on_success(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_rate_limits = 0;
    }

    pub async fn current_rpm(&self) -> f64 {
        self.state.lock().await.rpm
    }
}
