//! Per-job stage driver.
//!
//! Runs one audio job through transcription, summarization, media
//! generation, title generation, and result storage. A status row is
//! published before each stage begins, so observers never see a stage
//! skipped. Failure policy is explicit per stage: image and title failures
//! abort the job, video failures degrade to a missing video, and in "both"
//! mode branch failures are captured per medium while only a dispatch
//! failure aborts.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use serde_json::json;
use tracing::{error, info, info_span, warn, Instrument};

use ptalk_models::{
    AudioJob, GenerationMode, GenerationResult, MediaKind, SessionId, Stage, StageTimings,
    UsageRecord, VideoBrief,
};
use ptalk_openai::Completion;
use ptalk_veo::{VideoPollOutcome, VideoRequest};

use crate::capabilities::{
    BriefGenerator, ImageGenerator, MediaSink, StatusStore, TextGenerator, Transcriber,
    VideoOperations, VisionTitler,
};
use crate::error::{PipelineError, PipelineResult};
use crate::video_prompt::{VideoPromptBuilder, BRIEF_SYSTEM_PROMPT};

// =============================================================================
// Prompts and constants
// =============================================================================

const SUMMARY_INSTRUCTIONS: &str =
    "Create a concise 2-3 sentence summary that captures the key points and main theme.";

const IMAGE_PROMPT_INSTRUCTIONS: &str = "Create an artistic, visually rich image prompt. \
Be creative and descriptive, focusing on visual elements, colors, composition, and mood. \
Maximum 100 words.";

const TITLE_INSTRUCTIONS: &str =
    "Create a short, catchy title (maximum 5 words) that captures the essence of the content.";

/// Summary used when the transcript is too short to be worth summarizing.
pub const PLACEHOLDER_SUMMARY: &str = "Audio content was too brief or unclear to summarize.";

/// Transcripts shorter than this (trimmed) skip the summarization call.
const MIN_TRANSCRIPT_CHARS: usize = 5;

// =============================================================================
// Context
// =============================================================================

/// Shared collaborators for job processing.
pub struct PipelineContext {
    pub transcriber: Arc<dyn Transcriber>,
    pub text: Arc<dyn TextGenerator>,
    pub vision: Arc<dyn VisionTitler>,
    pub image: Arc<dyn ImageGenerator>,
    pub brief: Arc<dyn BriefGenerator>,
    /// Absent when GCP is not configured; video requests then degrade.
    pub video: Option<Arc<dyn VideoOperations>>,
    pub status: Arc<dyn StatusStore>,
    pub media: Arc<dyn MediaSink>,
    /// GCS bucket Veo writes rendered videos into, when configured.
    pub video_bucket: Option<String>,
}

// =============================================================================
// Entry point
// =============================================================================

/// Process one job to a terminal state.
///
/// Never returns an error: failures are recorded as a terminal `failed`
/// status row and logged.
pub async fn process_job(ctx: Arc<PipelineContext>, job: AudioJob) {
    let session_id = job.session_id.clone();
    let mode = job.mode;
    let started = Instant::now();

    let span = info_span!("process_job", session_id = %session_id, mode = %mode);
    async {
        info!(
            filename = %job.filename,
            audio_bytes = job.audio.len(),
            "Processing audio job"
        );

        match run_stages(&ctx, job, started).await {
            Ok(timings) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    timings = %timings.summary(),
                    "Job completed"
                );
                metrics::counter!("ptalk_jobs_completed_total").increment(1);
            }
            Err((stage, e)) => {
                error!(stage = %stage, error = %e, "Job failed");
                metrics::counter!("ptalk_jobs_failed_total", "stage" => stage.as_str())
                    .increment(1);

                let info = json!({
                    "error": e.to_string(),
                    "stage": stage.as_str(),
                    "elapsed_ms": started.elapsed().as_millis() as u64,
                });
                if let Err(e2) = ctx
                    .status
                    .update_status(session_id.as_str(), Stage::Failed.as_str(), Some(info))
                    .await
                {
                    error!(error = %e2, "Failed to record terminal failure status");
                }
            }
        }
    }
    .instrument(span)
    .await
}

// =============================================================================
// Stage driver
// =============================================================================

type StageOutcome<T> = Result<T, (Stage, PipelineError)>;

async fn run_stages(
    ctx: &Arc<PipelineContext>,
    job: AudioJob,
    started: Instant,
) -> StageOutcome<StageTimings> {
    let mut timings = StageTimings::new();
    let session = job.session_id.clone();
    let sid = session.as_str();

    // Stage 1: transcription
    publish(ctx, sid, Stage::Transcribing, None).await?;
    let stage_start = Instant::now();
    let transcript = ctx
        .transcriber
        .transcribe(job.audio, &job.filename)
        .await
        .map_err(|e| (Stage::Transcribing, e))?;
    record_stage(&mut timings, "transcription_ms", stage_start);
    info!(chars = transcript.len(), "Transcription completed");

    // Stage 2: summarization
    publish(ctx, sid, Stage::Summarizing, None).await?;
    let stage_start = Instant::now();
    let summary = if transcript.trim().chars().count() < MIN_TRANSCRIPT_CHARS {
        warn!(transcript = %transcript, "Transcript too short, using placeholder summary");
        PLACEHOLDER_SUMMARY.to_string()
    } else {
        let completion = ctx
            .text
            .generate(SUMMARY_INSTRUCTIONS, &transcript)
            .await
            .map_err(|e| (Stage::Summarizing, e))?;
        record_usage(ctx, sid, "summarization", &completion).await;
        completion.text
    };
    record_stage(&mut timings, "summarization_ms", stage_start);
    info!(chars = summary.len(), "Summarization completed");

    // Stage 3: media generation, branching by mode
    let mut image_url: Option<String> = None;
    let mut image_prompt: Option<String> = None;
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut video_url: Option<String> = None;
    let mut video_brief: Option<VideoBrief> = None;

    match job.mode {
        GenerationMode::Image => {
            publish(ctx, sid, Stage::GeneratingImage, None).await?;
            let stage_start = Instant::now();

            let (url, prompt, bytes) = generate_image(ctx, &session, &summary)
                .await
                .map_err(|e| (Stage::GeneratingImage, e))?;
            image_url = Some(url);
            image_prompt = Some(prompt);
            image_bytes = Some(bytes);
            record_stage(&mut timings, "image_generation_ms", stage_start);
        }
        GenerationMode::Video => {
            publish(ctx, sid, Stage::GeneratingVideo, None).await?;
            let stage_start = Instant::now();

            // The image prompt doubles as visual context for the brief.
            let prompt = generate_image_prompt(ctx, sid, &summary)
                .await
                .map_err(|e| (Stage::GeneratingVideo, e))?;

            match generate_video(ctx, &session, &summary, &prompt, &transcript).await {
                Ok((url, brief)) => {
                    video_url = Some(url);
                    video_brief = Some(brief);
                }
                Err(e) => {
                    // Video is best-effort: the job continues without it.
                    warn!(error = %e, "Video generation failed, continuing without video");
                }
            }
            image_prompt = Some(prompt);
            record_stage(&mut timings, "video_generation_ms", stage_start);
        }
        GenerationMode::Both => {
            publish(
                ctx,
                sid,
                Stage::GeneratingMedia,
                Some(json!({"image": "in_progress", "video": "in_progress"})),
            )
            .await?;
            let stage_start = Instant::now();

            // Shared prompt first; its failure aborts both branches.
            let prompt = generate_image_prompt(ctx, sid, &summary)
                .await
                .map_err(|e| (Stage::GeneratingMedia, e))?;
            image_prompt = Some(prompt.clone());

            let image_task = {
                let ctx = Arc::clone(ctx);
                let session = session.clone();
                let prompt = prompt.clone();
                tokio::spawn(
                    async move { generate_image_from_prompt(&ctx, &session, &prompt).await },
                )
            };
            let video_task = {
                let ctx = Arc::clone(ctx);
                let session = session.clone();
                let summary = summary.clone();
                let transcript = transcript.clone();
                tokio::spawn(async move {
                    generate_video(&ctx, &session, &summary, &prompt, &transcript).await
                })
            };

            // A JoinError means we lost a branch entirely; that is fatal.
            // A branch returning Err is captured per medium and suppressed.
            let (image_joined, video_joined) = tokio::join!(image_task, video_task);
            let image_result = image_joined
                .map_err(|e| (Stage::GeneratingMedia, PipelineError::dispatch(e.to_string())))?;
            let video_result = video_joined
                .map_err(|e| (Stage::GeneratingMedia, PipelineError::dispatch(e.to_string())))?;

            let mut branch_info = serde_json::Map::new();
            match image_result {
                // The revised prompt is dropped here: both branches share the
                // prompt generated above and that is what gets persisted.
                Ok((url, _revised, bytes)) => {
                    image_url = Some(url);
                    image_bytes = Some(bytes);
                    branch_info.insert("image".into(), json!("completed"));
                }
                Err(e) => {
                    warn!(error = %e, "Image branch failed");
                    branch_info.insert("image".into(), json!(format!("failed: {}", e)));
                }
            }
            match video_result {
                Ok((url, brief)) => {
                    video_url = Some(url);
                    video_brief = Some(brief);
                    branch_info.insert("video".into(), json!("completed"));
                }
                Err(e) => {
                    warn!(error = %e, "Video branch failed");
                    branch_info.insert("video".into(), json!(format!("failed: {}", e)));
                }
            }

            publish(
                ctx,
                sid,
                Stage::GeneratingMedia,
                Some(serde_json::Value::Object(branch_info)),
            )
            .await?;
            record_stage(&mut timings, "media_generation_ms", stage_start);
        }
    }

    // Stage 4: title generation (fatal on failure)
    publish(ctx, sid, Stage::GeneratingTitle, None).await?;
    let stage_start = Instant::now();
    let title = generate_title(
        ctx,
        sid,
        &summary,
        image_bytes.as_deref(),
        video_brief.as_ref(),
        image_prompt.as_deref(),
    )
    .await
    .map_err(|e| (Stage::GeneratingTitle, e))?;
    record_stage(&mut timings, "title_generation_ms", stage_start);
    info!(title = %title, "Title generated");

    // Stage 5: store the result row, then mark completed
    publish(ctx, sid, Stage::Storing, None).await?;
    let mut result =
        GenerationResult::completed(session.clone(), transcript, summary, title, job.mode);
    if job.mode.wants_image() {
        result.image_url = image_url;
        result.image_prompt = image_prompt.clone();
    }
    if job.mode.wants_video() {
        result.video_url = video_url;
        result.video_prompt = video_brief;
    }
    ctx.status
        .notify_result(&result)
        .await
        .map_err(|e| (Stage::Storing, e))?;

    publish(ctx, sid, Stage::Completed, None).await?;
    record_stage(&mut timings, "total_ms", started);
    Ok(timings)
}

// =============================================================================
// Stage helpers
// =============================================================================

async fn publish(
    ctx: &PipelineContext,
    session_id: &str,
    stage: Stage,
    info: Option<serde_json::Value>,
) -> StageOutcome<()> {
    ctx.status
        .update_status(session_id, stage.as_str(), info)
        .await
        .map(|_| ())
        .map_err(|e| (stage, e))
}

fn record_stage(timings: &mut StageTimings, name: &str, since: Instant) {
    let elapsed_ms = since.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("ptalk_stage_duration_ms", "stage" => name.to_string())
        .record(elapsed_ms);
    timings.record(name, elapsed_ms);
}

async fn record_usage(
    ctx: &PipelineContext,
    session_id: &str,
    request_type: &str,
    completion: &Completion,
) {
    if let Some(usage) = completion.usage {
        let record = UsageRecord::new(
            session_id,
            completion.id.clone(),
            request_type,
            completion.model.clone(),
            usage,
        );
        ctx.status.store_usage(&record).await;
    }
}

async fn generate_image_prompt(
    ctx: &PipelineContext,
    session_id: &str,
    summary: &str,
) -> PipelineResult<String> {
    let completion = ctx.text.generate(IMAGE_PROMPT_INSTRUCTIONS, summary).await?;
    record_usage(ctx, session_id, "image_prompt_generation", &completion).await;
    Ok(completion.text)
}

/// Image-mode path: prompt then render then persist.
async fn generate_image(
    ctx: &PipelineContext,
    session: &SessionId,
    summary: &str,
) -> PipelineResult<(String, String, Vec<u8>)> {
    let prompt = generate_image_prompt(ctx, session.as_str(), summary).await?;
    generate_image_from_prompt(ctx, session, &prompt).await
}

/// Render an image from an existing prompt and persist it.
/// Returns `(url, revised_prompt, png_bytes)`.
async fn generate_image_from_prompt(
    ctx: &PipelineContext,
    session: &SessionId,
    prompt: &str,
) -> PipelineResult<(String, String, Vec<u8>)> {
    let image = ctx.image.render(prompt).await?;
    let stored = ctx
        .media
        .store(MediaKind::Image, session, image.bytes.clone())
        .await?;
    Ok((stored.url, image.revised_prompt, image.bytes))
}

/// Full video path: brief, flatten, submit, wait, resolve URL.
/// Returns `(video_url, brief)`.
async fn generate_video(
    ctx: &PipelineContext,
    session: &SessionId,
    summary: &str,
    image_prompt: &str,
    transcript: &str,
) -> PipelineResult<(String, VideoBrief)> {
    let video = ctx.video.as_ref().ok_or(PipelineError::VideoUnavailable)?;

    let user_prompt =
        VideoPromptBuilder::build_user_prompt(summary, Some(image_prompt), Some(transcript));
    let (brief, completion) = ctx
        .brief
        .generate_brief(BRIEF_SYSTEM_PROMPT, &user_prompt)
        .await?;
    record_usage(ctx, session.as_str(), "video_prompt_generation", &completion).await;
    VideoPromptBuilder::validate(&brief)?;

    let prompt_text = brief.flatten();
    info!(prompt_chars = prompt_text.len(), "Submitting video generation");

    let mut request = VideoRequest::new(prompt_text);
    if let Some(bucket) = &ctx.video_bucket {
        request = request.with_storage_uri(format!("gs://{}/videos/{}/", bucket, session));
    }

    let url = match video.generate(request).await? {
        VideoPollOutcome::Completed {
            gcs_uri: Some(uri), ..
        } => {
            // Rendered straight into GCS; record the reference as-is.
            uri
        }
        VideoPollOutcome::Completed {
            bytes_base64: Some(b64),
            ..
        } => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| PipelineError::other(format!("Invalid video base64: {}", e)))?;
            let stored = ctx.media.store(MediaKind::Video, session, bytes).await?;
            stored.url
        }
        VideoPollOutcome::Completed { .. } => {
            return Err(PipelineError::other(
                "Video operation completed without payload",
            ));
        }
        VideoPollOutcome::TimedOut { operation_name } => {
            // Still rendering; hand observers the operation reference.
            warn!(operation = %operation_name, "Video still rendering at timeout");
            format!("pending:{}", operation_name)
        }
    };

    Ok((url, brief))
}

async fn generate_title(
    ctx: &PipelineContext,
    session_id: &str,
    summary: &str,
    image_bytes: Option<&[u8]>,
    video_brief: Option<&VideoBrief>,
    image_prompt: Option<&str>,
) -> PipelineResult<String> {
    let completion = if let Some(bytes) = image_bytes {
        let prompt = format!(
            "Based on this image and summary, create a short, catchy title (max 5 words) \
             that captures the essence of both.\n\nSummary: {}",
            summary
        );
        ctx.vision.title_from_image(bytes, &prompt).await?
    } else {
        let visual = video_brief
            .map(|b| b.flatten())
            .or_else(|| image_prompt.map(str::to_string));
        let input = match visual {
            Some(v) => format!("Summary: {}\n\nVisual concept: {}", summary, v),
            None => summary.to_string(),
        };
        ctx.text.generate(TITLE_INSTRUCTIONS, &input).await?
    };
    record_usage(ctx, session_id, "title_generation", &completion).await;

    Ok(completion.text.trim().trim_matches('"').to_string())
}
