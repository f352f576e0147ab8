//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by tools and their callers
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Caller supplied parameters that do not match the tool's input schema
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// No tool is registered under the requested name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Processing failed inside a tool or stage
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ToolNotFound("detect_crises".to_string());
        assert_eq!(err.to_string(), "Tool not found: detect_crises");

        let err = Error::InvalidParameters("limit must be an integer".to_string());
        assert_eq!(err.to_string(), "Invalid parameters: limit must be an integer");
    }
}
