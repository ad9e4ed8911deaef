//! LLM capability seam.
//!
//! The platform never builds provider adapters itself; it consumes one
//! capability: given a prompt and an output schema, return a conforming JSON
//! object or fail.

use std::time::Duration;

use serde_json::Value;

use crate::domain::{LlmProvider, Result};

use super::schema::SchemaDescriptor;

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub timeout: Duration,
    pub model: Option<String>,
}

impl GenerateOptions {
    pub fn for_provider(provider: LlmProvider) -> Self {
        Self {
            temperature: 0.0,
            timeout: provider.default_call_timeout(),
            model: None,
        }
    }
}

#[async_trait::async_trait]
pub trait LlmCapability: Send + Sync {
    /// Produce an object intended to conform to `schema`. The orchestrator
    /// validates and retries; implementations only need best effort.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
        options: &GenerateOptions,
    ) -> Result<Value>;

    fn provider(&self) -> LlmProvider;
}
