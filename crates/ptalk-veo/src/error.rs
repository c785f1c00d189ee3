//! Veo client error types.

use thiserror::Error;

/// Result type for Veo operations.
pub type VeoResult<T> = Result<T, VeoError>;

/// Errors that can occur during Veo API calls.
#[derive(Debug, Error)]
pub enum VeoError {
    #[error("Veo configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Veo API returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Video operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VeoError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}
