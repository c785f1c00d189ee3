//! Final generation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::brief::VideoBrief;
use crate::job::{GenerationMode, SessionId};

/// Kind of generated media artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// File extension for local fallback storage.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }

    /// MIME type used for remote uploads.
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/png",
            MediaKind::Video => "video/mp4",
        }
    }
}

/// Terminal status of a session result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Completed,
    Failed,
}

/// The final record written once per job at the end of the pipeline.
///
/// Keyed by session id with upsert semantics: reprocessing the same session
/// overwrites the previous row, never partially. Media fields absent from
/// the mode (or lost to a suppressed branch failure) are omitted from the
/// serialized row rather than set to null placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub session_id: SessionId,
    pub transcript: String,
    pub summary: String,
    pub title: String,
    pub generation_mode: GenerationMode,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_prompt: Option<VideoBrief>,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    /// Create a completed result with no media attached yet.
    pub fn completed(
        session_id: SessionId,
        transcript: impl Into<String>,
        summary: impl Into<String>,
        title: impl Into<String>,
        mode: GenerationMode,
    ) -> Self {
        Self {
            session_id,
            transcript: transcript.into(),
            summary: summary.into(),
            title: title.into(),
            generation_mode: mode,
            status: ResultStatus::Completed,
            image_url: None,
            image_prompt: None,
            video_url: None,
            video_prompt: None,
            created_at: Utc::now(),
        }
    }
}
