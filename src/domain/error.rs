use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndicatorOpsError>;

#[derive(Error, Debug)]
pub enum IndicatorOpsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error for item {item}: {reason}")]
    Validation { item: String, reason: String },

    #[error("Unit parse error for \"{unit}\": {reason}")]
    Parse { unit: String, reason: String },

    #[error("Missing FX rate for currency {currency}")]
    MissingFxRate { currency: String },

    #[error("FX table invariant violated: {0}")]
    FxTableInvariant(String),

    #[error("Unknown tier: {label}")]
    UnknownTier { label: String },

    #[error("Schema validation failed at stage {stage}, path {path}: {reason}")]
    SchemaValidation {
        stage: String,
        path: String,
        reason: String,
    },

    #[error("Stage {stage} failed for indicator {indicator_id}: {reason}")]
    StageFailure {
        indicator_id: String,
        stage: String,
        reason: String,
    },

    #[error("Transport error on endpoint {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("Timeout during {operation}")]
    Timeout { operation: String },

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndicatorOpsError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        IndicatorOpsError::Config(msg.into())
    }

    pub fn validation<I: Into<String>, S: Into<String>>(item: I, reason: S) -> Self {
        IndicatorOpsError::Validation {
            item: item.into(),
            reason: reason.into(),
        }
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        IndicatorOpsError::Internal(msg.into())
    }

    pub fn transport<E: Into<String>, S: Into<String>>(endpoint: E, reason: S) -> Self {
        IndicatorOpsError::Transport {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn stage_failure<I: Into<String>, T: Into<String>, S: Into<String>>(
        indicator_id: I,
        stage: T,
        reason: S,
    ) -> Self {
        IndicatorOpsError::StageFailure {
            indicator_id: indicator_id.into(),
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry of the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IndicatorOpsError::SchemaValidation { .. }
                | IndicatorOpsError::Transport { .. }
                | IndicatorOpsError::Timeout { .. }
                | IndicatorOpsError::RateLimited { .. }
        )
    }
}
