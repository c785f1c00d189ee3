//! Wire types for the Vertex AI Veo API.

use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

/// Tunable parameters for one video generation request.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    /// Flattened natural-language prompt
    pub prompt: String,
    /// Aspect ratio, e.g. "16:9"
    pub aspect_ratio: String,
    /// Clip length in seconds
    pub duration_seconds: u32,
    /// Output resolution, e.g. "720p"
    pub resolution: String,
    /// Person generation policy
    pub person_generation: String,
    /// How many samples to render
    pub sample_count: u32,
    /// Optional GCS prefix the rendered video is written under
    pub storage_uri: Option<String>,
    /// Optional negative prompt
    pub negative_prompt: Option<String>,
    /// Optional deterministic seed
    pub seed: Option<u64>,
}

impl VideoRequest {
    /// Request with default rendering parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: "16:9".to_string(),
            duration_seconds: 8,
            resolution: "720p".to_string(),
            person_generation: "allow".to_string(),
            sample_count: 1,
            storage_uri: None,
            negative_prompt: None,
            seed: None,
        }
    }

    pub fn with_storage_uri(mut self, uri: impl Into<String>) -> Self {
        self.storage_uri = Some(uri.into());
        self
    }

    pub fn with_negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest {
    pub instances: Vec<PromptInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
pub(crate) struct PromptInstance {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredictParameters {
    pub aspect_ratio: String,
    pub duration_seconds: u32,
    pub resolution: String,
    pub person_generation: String,
    pub sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FetchOperationRequest {
    pub operation_name: String,
}

// =============================================================================
// Responses
// =============================================================================

/// State of a long-running video operation as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationHandle {
    /// Fully-qualified operation name
    pub name: String,
    /// True once the operation reached a terminal state
    #[serde(default)]
    pub done: bool,
    /// Terminal error, when the operation failed
    pub error: Option<OperationError>,
    /// Terminal payload, when the operation succeeded
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationResponse {
    #[serde(default)]
    pub videos: Vec<GeneratedVideo>,
}

/// One rendered video. Either a GCS reference or inline base64, depending
/// on whether a storage URI was supplied at submit time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVideo {
    pub gcs_uri: Option<String>,
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
}

// =============================================================================
// Poll outcomes
// =============================================================================

/// Terminal result of waiting on a video operation.
#[derive(Debug, Clone)]
pub enum VideoPollOutcome {
    /// The operation finished and produced a video.
    Completed {
        gcs_uri: Option<String>,
        bytes_base64: Option<String>,
        mime_type: Option<String>,
    },
    /// The wait budget ran out while the operation was still running.
    /// Carries the operation name so callers can record it for later lookup.
    TimedOut { operation_name: String },
}
