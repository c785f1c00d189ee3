//! Stage driver and orchestrator behavior, exercised through fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use ptalk_models::{
    AudioJob, GenerationMode, GenerationResult, MediaKind, SessionId, UsageRecord, VideoBrief,
};
use ptalk_openai::{Completion, GeneratedImage};
use ptalk_pipeline::{
    process_job, BriefGenerator, ImageGenerator, MediaSink, Orchestrator, PipelineContext,
    PipelineError, PipelineResult, StatusStore, TextGenerator, Transcriber, VideoOperations,
    VisionTitler, PLACEHOLDER_SUMMARY,
};
use ptalk_storage::{MediaLocation, StoredMedia};
use ptalk_veo::{VideoPollOutcome, VideoRequest};

// =============================================================================
// Fakes
// =============================================================================

fn completion(text: &str) -> Completion {
    Completion {
        id: format!("resp-{}", text.len()),
        model: "fake-model".to_string(),
        text: text.to_string(),
        usage: Some(ptalk_models::TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

fn valid_brief() -> VideoBrief {
    VideoBrief {
        description: "A drifting city of lights.".to_string(),
        style: "cinematic".to_string(),
        camera: "slow dolly".to_string(),
        lighting: "golden hour".to_string(),
        environment: "rooftop garden".to_string(),
        elements: (0..8).map(|i| format!("element {i}")).collect(),
        motion: "gentle parallax".to_string(),
        ending: "a fade to skyline".to_string(),
        text: "none".to_string(),
        keywords: (0..5).map(|i| format!("kw{i}")).collect(),
    }
}

struct FakeTranscriber(String);

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> PipelineResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct FakeText {
    instructions_seen: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, instructions: &str, _input: &str) -> PipelineResult<Completion> {
        self.instructions_seen
            .lock()
            .await
            .push(instructions.to_string());
        let text = if instructions.contains("summary") {
            "A concise summary."
        } else if instructions.contains("image prompt") {
            "A painterly scene of light."
        } else {
            "Text Title"
        };
        Ok(completion(text))
    }
}

struct FakeImage {
    fail: bool,
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn render(&self, prompt: &str) -> PipelineResult<GeneratedImage> {
        if self.fail {
            return Err(PipelineError::other("render failed"));
        }
        Ok(GeneratedImage {
            bytes: vec![1, 2, 3, 4],
            revised_prompt: format!("revised: {prompt}"),
        })
    }
}

struct FakeVision {
    fail: bool,
}

#[async_trait]
impl VisionTitler for FakeVision {
    async fn title_from_image(
        &self,
        _image_png: &[u8],
        _prompt: &str,
    ) -> PipelineResult<Completion> {
        if self.fail {
            return Err(PipelineError::other("vision unavailable"));
        }
        Ok(completion("Vision Title"))
    }
}

struct FakeBrief;

#[async_trait]
impl BriefGenerator for FakeBrief {
    async fn generate_brief(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> PipelineResult<(VideoBrief, Completion)> {
        Ok((valid_brief(), completion("{}")))
    }
}

struct FakeVideo {
    outcome: VideoPollOutcome,
    requests: Mutex<Vec<VideoRequest>>,
}

impl FakeVideo {
    fn completed_gcs(uri: &str) -> Self {
        Self {
            outcome: VideoPollOutcome::Completed {
                gcs_uri: Some(uri.to_string()),
                bytes_base64: None,
                mime_type: Some("video/mp4".to_string()),
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    fn timed_out(op: &str) -> Self {
        Self {
            outcome: VideoPollOutcome::TimedOut {
                operation_name: op.to_string(),
            },
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VideoOperations for FakeVideo {
    async fn generate(&self, request: VideoRequest) -> PipelineResult<VideoPollOutcome> {
        self.requests.lock().await.push(request);
        Ok(self.outcome.clone())
    }
}

#[derive(Default)]
struct FakeStatusStore {
    updates: Mutex<Vec<(String, String, Option<Value>)>>,
    results: Mutex<Vec<GenerationResult>>,
    usage: Mutex<Vec<UsageRecord>>,
}

impl FakeStatusStore {
    async fn statuses(&self) -> Vec<String> {
        self.updates
            .lock()
            .await
            .iter()
            .map(|(_, s, _)| s.clone())
            .collect()
    }
}

#[async_trait]
impl StatusStore for FakeStatusStore {
    async fn update_status(
        &self,
        session_id: &str,
        status: &str,
        additional_info: Option<Value>,
    ) -> PipelineResult<u64> {
        let mut updates = self.updates.lock().await;
        updates.push((session_id.to_string(), status.to_string(), additional_info));
        Ok(updates.len() as u64)
    }

    async fn notify_result(&self, result: &GenerationResult) -> PipelineResult<()> {
        self.results.lock().await.push(result.clone());
        Ok(())
    }

    async fn store_usage(&self, record: &UsageRecord) {
        self.usage.lock().await.push(record.clone());
    }
}

#[derive(Default)]
struct FakeMedia {
    stored: Mutex<Vec<(MediaKind, String)>>,
}

#[async_trait]
impl MediaSink for FakeMedia {
    async fn store(
        &self,
        kind: MediaKind,
        session_id: &SessionId,
        _bytes: Vec<u8>,
    ) -> PipelineResult<StoredMedia> {
        self.stored
            .lock()
            .await
            .push((kind, session_id.to_string()));
        Ok(StoredMedia {
            url: format!("http://media/{}/{}.{}", kind.as_str(), session_id, kind.extension()),
            location: MediaLocation::Local,
        })
    }
}

// =============================================================================
// Context builder
// =============================================================================

struct Harness {
    status: Arc<FakeStatusStore>,
    media: Arc<FakeMedia>,
    text: Arc<FakeText>,
    ctx: Arc<PipelineContext>,
}

fn harness(
    transcript: &str,
    image_fail: bool,
    vision_fail: bool,
    video: Option<Arc<dyn VideoOperations>>,
) -> Harness {
    let status = Arc::new(FakeStatusStore::default());
    let media = Arc::new(FakeMedia::default());
    let text = Arc::new(FakeText::default());

    let ctx = Arc::new(PipelineContext {
        transcriber: Arc::new(FakeTranscriber(transcript.to_string())),
        text: text.clone(),
        vision: Arc::new(FakeVision { fail: vision_fail }),
        image: Arc::new(FakeImage { fail: image_fail }),
        brief: Arc::new(FakeBrief),
        video,
        status: status.clone(),
        media: media.clone(),
        video_bucket: Some("test-bucket".to_string()),
    });

    Harness {
        status,
        media,
        text,
        ctx,
    }
}

fn job(mode: GenerationMode) -> AudioJob {
    AudioJob::new(SessionId::new(), vec![0u8; 64], "clip.wav", mode)
}

// =============================================================================
// Stage driver tests
// =============================================================================

#[tokio::test]
async fn image_mode_publishes_every_stage_in_order() {
    let h = harness("a long enough transcript", false, false, None);
    process_job(h.ctx.clone(), job(GenerationMode::Image)).await;

    assert_eq!(
        h.status.statuses().await,
        vec![
            "transcribing",
            "summarizing",
            "generating_image",
            "generating_title",
            "storing",
            "completed"
        ]
    );

    let results = h.status.results.lock().await;
    let result = &results[0];
    assert!(result.image_url.is_some());
    assert!(result.image_prompt.is_some());
    assert!(result.video_url.is_none());
    assert_eq!(result.title, "Vision Title");
    assert_eq!(result.summary, "A concise summary.");

    let stored = h.media.stored.lock().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, MediaKind::Image);
}

#[tokio::test]
async fn short_transcript_skips_summarization_call() {
    let h = harness("hi", false, false, None);
    process_job(h.ctx.clone(), job(GenerationMode::Image)).await;

    let results = h.status.results.lock().await;
    assert_eq!(results[0].summary, PLACEHOLDER_SUMMARY);

    // The text generator was never asked for a summary.
    let seen = h.text.instructions_seen.lock().await;
    assert!(seen.iter().all(|i| !i.contains("summary")));
}

#[tokio::test]
async fn missing_video_backend_degrades_not_fails() {
    let h = harness("a long enough transcript", false, false, None);
    process_job(h.ctx.clone(), job(GenerationMode::Video)).await;

    let statuses = h.status.statuses().await;
    assert_eq!(statuses.last().unwrap(), "completed");
    assert!(statuses.contains(&"generating_video".to_string()));

    let results = h.status.results.lock().await;
    assert!(results[0].video_url.is_none());
    assert!(results[0].video_prompt.is_none());
    // No image bytes in video mode, so the title came from the text model.
    assert_eq!(results[0].title, "Text Title");
}

#[tokio::test]
async fn completed_video_records_gcs_uri_directly() {
    let video = Arc::new(FakeVideo::completed_gcs("gs://bucket/videos/s/sample_0.mp4"));
    let h = harness(
        "a long enough transcript",
        false,
        false,
        Some(video.clone()),
    );
    process_job(h.ctx.clone(), job(GenerationMode::Video)).await;

    let results = h.status.results.lock().await;
    assert_eq!(
        results[0].video_url.as_deref(),
        Some("gs://bucket/videos/s/sample_0.mp4")
    );
    assert!(results[0].video_prompt.is_some());

    // GCS delivery bypasses the media sink.
    assert!(h.media.stored.lock().await.is_empty());

    // The submit carried the configured storage bucket.
    let requests = video.requests.lock().await;
    let uri = requests[0].storage_uri.as_deref().unwrap();
    assert!(uri.starts_with("gs://test-bucket/videos/"));
    assert!(uri.ends_with('/'));
}

#[tokio::test]
async fn video_timeout_yields_pending_url() {
    let video = Arc::new(FakeVideo::timed_out("op-123"));
    let h = harness("a long enough transcript", false, false, Some(video));
    process_job(h.ctx.clone(), job(GenerationMode::Video)).await;

    let results = h.status.results.lock().await;
    assert_eq!(results[0].video_url.as_deref(), Some("pending:op-123"));
}

#[tokio::test]
async fn both_mode_captures_image_branch_failure() {
    let video = Arc::new(FakeVideo::completed_gcs("gs://bucket/v.mp4"));
    let h = harness("a long enough transcript", true, false, Some(video));
    process_job(h.ctx.clone(), job(GenerationMode::Both)).await;

    let statuses = h.status.statuses().await;
    assert_eq!(statuses.last().unwrap(), "completed");

    let updates = h.status.updates.lock().await;

    // The first generating_media row marks both branches in progress.
    let first_row = updates
        .iter()
        .find(|(_, s, _)| s == "generating_media")
        .unwrap();
    let info = first_row.2.as_ref().unwrap();
    assert_eq!(info["image"], "in_progress");
    assert_eq!(info["video"], "in_progress");

    // The second generating_media row carries per-branch outcomes.
    let branch_row = updates
        .iter()
        .filter(|(_, s, _)| s == "generating_media")
        .last()
        .unwrap();
    let info = branch_row.2.as_ref().unwrap();
    assert!(info["image"].as_str().unwrap().starts_with("failed:"));
    assert_eq!(info["video"], "completed");

    let results = h.status.results.lock().await;
    assert!(results[0].image_url.is_none());
    assert_eq!(results[0].video_url.as_deref(), Some("gs://bucket/v.mp4"));
}

#[tokio::test]
async fn both_mode_success_populates_both_media() {
    let video = Arc::new(FakeVideo::completed_gcs("gs://bucket/v.mp4"));
    let h = harness("a long enough transcript", false, false, Some(video));
    process_job(h.ctx.clone(), job(GenerationMode::Both)).await;

    let results = h.status.results.lock().await;
    assert!(results[0].image_url.is_some());
    assert!(results[0].video_url.is_some());
    // The shared prompt is persisted, not the image branch's revision.
    assert_eq!(
        results[0].image_prompt.as_deref(),
        Some("A painterly scene of light.")
    );
    // Image bytes exist, so the title used the vision model.
    assert_eq!(results[0].title, "Vision Title");
}

#[tokio::test]
async fn title_failure_is_terminal() {
    let h = harness("a long enough transcript", false, true, None);
    process_job(h.ctx.clone(), job(GenerationMode::Image)).await;

    let updates = h.status.updates.lock().await;
    let (_, status, info) = updates.last().unwrap();
    assert_eq!(status, "failed");
    let info = info.as_ref().unwrap();
    assert_eq!(info["stage"], "generating_title");
    assert!(info["error"].as_str().unwrap().contains("vision unavailable"));
    assert!(info["elapsed_ms"].is_number());

    assert!(h.status.results.lock().await.is_empty());
}

#[tokio::test]
async fn usage_records_are_forwarded() {
    let h = harness("a long enough transcript", false, false, None);
    process_job(h.ctx.clone(), job(GenerationMode::Image)).await;

    let usage = h.status.usage.lock().await;
    let types: Vec<&str> = usage.iter().map(|u| u.request_type.as_str()).collect();
    assert!(types.contains(&"summarization"));
    assert!(types.contains(&"image_prompt_generation"));
    assert!(types.contains(&"title_generation"));
    assert!(usage.iter().all(|u| u.tokens.total_tokens == 15));
}

// =============================================================================
// Orchestrator tests
// =============================================================================

#[tokio::test]
async fn orchestrator_processes_jobs_in_arrival_order() {
    let h = harness("a long enough transcript", false, false, None);
    let orchestrator = Orchestrator::new(h.ctx.clone());

    let first = job(GenerationMode::Image);
    let second = job(GenerationMode::Image);
    let first_id = first.session_id.to_string();
    let second_id = second.session_id.to_string();

    orchestrator.enqueue(first).unwrap();
    orchestrator.enqueue(second).unwrap();
    assert_eq!(orchestrator.queue_depth(), 2);

    orchestrator.start().await;
    assert!(orchestrator.worker_alive().await);

    // Wait until both jobs reached a terminal state.
    for _ in 0..100 {
        let done = h
            .status
            .statuses()
            .await
            .iter()
            .filter(|s| *s == "completed")
            .count();
        if done == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let updates = h.status.updates.lock().await;
    let completed: Vec<String> = updates
        .iter()
        .filter(|(_, s, _)| s == "completed")
        .map(|(sid, _, _)| sid.clone())
        .collect();
    assert_eq!(completed, vec![first_id, second_id]);
    drop(updates);

    orchestrator.stop().await;
    assert!(!orchestrator.worker_alive().await);
}

#[tokio::test]
async fn stop_without_start_is_clean() {
    let h = harness("t", false, false, None);
    let orchestrator = Orchestrator::new(h.ctx.clone());
    orchestrator.stop().await;
    assert!(!orchestrator.worker_alive().await);
}
