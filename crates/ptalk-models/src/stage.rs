//! Pipeline stage definitions and timing records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Named step of the processing pipeline.
///
/// The current stage is the externally observable processing state: a status
/// row is published before each stage begins, so observers never see a stage
/// skipped. The sequence advances monotonically except on failure, which is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcribing,
    Summarizing,
    GeneratingImage,
    GeneratingVideo,
    /// Concurrent image + video generation ("both" mode)
    GeneratingMedia,
    GeneratingTitle,
    Storing,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcribing => "transcribing",
            Stage::Summarizing => "summarizing",
            Stage::GeneratingImage => "generating_image",
            Stage::GeneratingVideo => "generating_video",
            Stage::GeneratingMedia => "generating_media",
            Stage::GeneratingTitle => "generating_title",
            Stage::Storing => "storing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-job stage timing record.
///
/// Best-effort telemetry only: emitted as a log summary at job end, never
/// persisted as part of the data model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    timings_ms: BTreeMap<String, f64>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record elapsed milliseconds for a named measurement.
    pub fn record(&mut self, name: impl Into<String>, elapsed_ms: f64) {
        self.timings_ms.insert(name.into(), elapsed_ms);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.timings_ms.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.timings_ms.is_empty()
    }

    /// One-line summary for the end-of-job log.
    pub fn summary(&self) -> String {
        self.timings_ms
            .iter()
            .map(|(k, v)| format!("{}: {:.2}ms", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
