use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend family a classification batch is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Local,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Local => "local",
        }
    }

    /// Local models get a much longer call budget than remote APIs.
    pub fn default_call_timeout(&self) -> std::time::Duration {
        match self {
            LlmProvider::Local => std::time::Duration::from_secs(600),
            _ => std::time::Duration::from_secs(60),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
