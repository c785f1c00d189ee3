//! Pipeline error types.

use thiserror::Error;

use ptalk_db::DbError;
use ptalk_models::BriefError;
use ptalk_openai::OpenAiError;
use ptalk_storage::StorageError;
use ptalk_veo::VeoError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur during pipeline processing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model call failed: {0}")]
    OpenAi(#[from] OpenAiError),

    #[error("Video generation failed: {0}")]
    Video(#[from] VeoError),

    #[error("Database operation failed: {0}")]
    Db(#[from] DbError),

    #[error("Media storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Video brief out of bounds: {0}")]
    InvalidBrief(#[from] BriefError),

    #[error("Video generation unavailable: GCP project not configured")]
    VideoUnavailable,

    #[error("Task dispatch failed: {0}")]
    Dispatch(String),

    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
