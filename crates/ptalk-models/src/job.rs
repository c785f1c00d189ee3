//! Audio job definitions for queue processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a processing session.
///
/// One session corresponds to one uploaded audio clip and its end-to-end
/// processing lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What media to generate for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Generate a still image only
    #[default]
    Image,
    /// Generate a short video only
    Video,
    /// Generate both, with the two pipelines running concurrently
    Both,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Image => "image",
            GenerationMode::Video => "video",
            GenerationMode::Both => "both",
        }
    }

    /// Whether this mode produces an image.
    pub fn wants_image(&self) -> bool {
        matches!(self, GenerationMode::Image | GenerationMode::Both)
    }

    /// Whether this mode produces a video.
    pub fn wants_video(&self) -> bool {
        matches!(self, GenerationMode::Video | GenerationMode::Both)
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(GenerationMode::Image),
            "video" => Ok(GenerationMode::Video),
            "both" => Ok(GenerationMode::Both),
            other => Err(format!(
                "Invalid generation mode '{}'. Must be 'image', 'video', or 'both'",
                other
            )),
        }
    }
}

/// A queued audio processing job.
///
/// Immutable once enqueued; consumed exactly once by the worker and
/// discarded after processing. The audio content is fully buffered so the
/// caller's upload stream can be closed immediately.
#[derive(Debug, Clone)]
pub struct AudioJob {
    /// Session this job belongs to
    pub session_id: SessionId,
    /// Raw audio file bytes
    pub audio: Vec<u8>,
    /// Original filename (used for format hints)
    pub filename: String,
    /// What media to generate
    pub mode: GenerationMode,
    /// When the job was accepted
    pub enqueued_at: DateTime<Utc>,
}

impl AudioJob {
    pub fn new(
        session_id: SessionId,
        audio: Vec<u8>,
        filename: impl Into<String>,
        mode: GenerationMode,
    ) -> Self {
        Self {
            session_id,
            audio,
            filename: filename.into(),
            mode,
            enqueued_at: Utc::now(),
        }
    }
}
