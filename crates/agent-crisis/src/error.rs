//! Error types for crisis pipeline operations

use crate::topic::Stage;
use thiserror::Error;

/// Crisis pipeline errors
#[derive(Debug, Error)]
pub enum CrisisError {
    /// Backing store for a stage is missing or unreadable
    #[error("{stage} crises source not found or unreadable: {reason}")]
    SourceUnavailable {
        stage: Stage,
        reason: String,
    },

    /// A record lacks a field required by its stage
    #[error("Malformed {stage} record: {reason}")]
    MalformedRecord {
        stage: Stage,
        reason: String,
    },

    /// Caller-supplied parameters are invalid
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CrisisError {
    /// Shorthand for a `SourceUnavailable` error
    pub fn unavailable(stage: Stage, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            stage,
            reason: reason.into(),
        }
    }

    /// Shorthand for a `MalformedRecord` error
    pub fn malformed(stage: Stage, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            stage,
            reason: reason.into(),
        }
    }
}

/// Result type alias for crisis operations
pub type Result<T> = std::result::Result<T, CrisisError>;

/// Convert CrisisError to agent_core::Error
impl From<CrisisError> for agent_core::Error {
    fn from(err: CrisisError) -> Self {
        match err {
            CrisisError::InvalidParameters(msg) => agent_core::Error::InvalidParameters(msg),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

/// Convert agent_core::Error to CrisisError
impl From<agent_core::Error> for CrisisError {
    fn from(err: agent_core::Error) -> Self {
        CrisisError::Other(err.to_string())
    }
}
