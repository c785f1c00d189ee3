//! OpenAI client error types.

use thiserror::Error;

/// Result type for OpenAI operations.
pub type OpenAiResult<T> = Result<T, OpenAiError>;

/// Errors that can occur during OpenAI API calls.
#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OpenAI configuration error: {0}")]
    ConfigError(String),

    #[error("OpenAI API returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Structured output did not match schema: {0}")]
    SchemaViolation(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpenAiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }
}
