//! Capability traits for pipeline collaborators.
//!
//! The stage driver talks to models, persistence, and storage only through
//! these traits, so tests swap in hand-written fakes without any network.
//! The blanket impls below bind the real clients.

use async_trait::async_trait;
use serde_json::Value;

use ptalk_db::NeonClient;
use ptalk_models::{GenerationResult, MediaKind, SessionId, UsageRecord, VideoBrief};
use ptalk_openai::{Completion, GeneratedImage, OpenAiClient};
use ptalk_storage::{MediaStore, StoredMedia};
use ptalk_veo::{VeoClient, VideoPollOutcome, VideoRequest};

use crate::error::PipelineResult;

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> PipelineResult<String>;
}

/// Instructed text generation (summaries, titles, image prompts).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, instructions: &str, input: &str) -> PipelineResult<Completion>;
}

/// Prompt-to-image rendering.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn render(&self, prompt: &str) -> PipelineResult<GeneratedImage>;
}

/// Image-grounded text generation, used for titles when image bytes exist.
#[async_trait]
pub trait VisionTitler: Send + Sync {
    async fn title_from_image(&self, image_png: &[u8], prompt: &str)
        -> PipelineResult<Completion>;
}

/// Schema-constrained video brief generation.
#[async_trait]
pub trait BriefGenerator: Send + Sync {
    async fn generate_brief(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> PipelineResult<(VideoBrief, Completion)>;
}

/// Long-running video generation, submit + bounded wait.
#[async_trait]
pub trait VideoOperations: Send + Sync {
    async fn generate(&self, request: VideoRequest) -> PipelineResult<VideoPollOutcome>;
}

/// Session state persistence.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn update_status(
        &self,
        session_id: &str,
        status: &str,
        additional_info: Option<Value>,
    ) -> PipelineResult<u64>;

    async fn notify_result(&self, result: &GenerationResult) -> PipelineResult<()>;

    /// Best-effort telemetry write; never fails the caller.
    async fn store_usage(&self, record: &UsageRecord);
}

/// Media persistence.
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn store(
        &self,
        kind: MediaKind,
        session_id: &SessionId,
        bytes: Vec<u8>,
    ) -> PipelineResult<StoredMedia>;
}

// =============================================================================
// Bindings to the real clients
// =============================================================================

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> PipelineResult<String> {
        Ok(OpenAiClient::transcribe(self, audio, filename).await?)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, instructions: &str, input: &str) -> PipelineResult<Completion> {
        Ok(self.respond(instructions, input).await?)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn render(&self, prompt: &str) -> PipelineResult<GeneratedImage> {
        Ok(self.generate_image(prompt).await?)
    }
}

#[async_trait]
impl VisionTitler for OpenAiClient {
    async fn title_from_image(
        &self,
        image_png: &[u8],
        prompt: &str,
    ) -> PipelineResult<Completion> {
        Ok(self.respond_with_image(image_png, prompt).await?)
    }
}

#[async_trait]
impl BriefGenerator for OpenAiClient {
    async fn generate_brief(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> PipelineResult<(VideoBrief, Completion)> {
        Ok(OpenAiClient::generate_brief(self, system_prompt, user_prompt).await?)
    }
}

#[async_trait]
impl VideoOperations for VeoClient {
    async fn generate(&self, request: VideoRequest) -> PipelineResult<VideoPollOutcome> {
        Ok(VeoClient::generate(self, &request).await?)
    }
}

#[async_trait]
impl StatusStore for NeonClient {
    async fn update_status(
        &self,
        session_id: &str,
        status: &str,
        additional_info: Option<Value>,
    ) -> PipelineResult<u64> {
        Ok(NeonClient::update_status(self, session_id, status, additional_info).await?)
    }

    async fn notify_result(&self, result: &GenerationResult) -> PipelineResult<()> {
        Ok(NeonClient::notify_result(self, result).await?)
    }

    async fn store_usage(&self, record: &UsageRecord) {
        NeonClient::store_usage(self, record).await;
    }
}

#[async_trait]
impl MediaSink for MediaStore {
    async fn store(
        &self,
        kind: MediaKind,
        session_id: &SessionId,
        bytes: Vec<u8>,
    ) -> PipelineResult<StoredMedia> {
        Ok(MediaStore::store(self, kind, session_id, bytes).await?)
    }
}
