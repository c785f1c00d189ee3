//! Audio processing pipeline for PixelTalk.
//!
//! Owns the job queue, the background worker, and the per-job stage driver
//! that turns an uploaded audio clip into a transcript, summary, generated
//! media, title, and persisted result.

pub mod capabilities;
pub mod error;
pub mod orchestrator;
pub mod processor;
pub mod video_prompt;

pub use capabilities::{
    BriefGenerator, ImageGenerator, MediaSink, StatusStore, TextGenerator, Transcriber,
    VideoOperations, VisionTitler,
};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Orchestrator;
pub use processor::{process_job, PipelineContext, PLACEHOLDER_SUMMARY};
pub use video_prompt::{VideoPromptBuilder, BRIEF_SYSTEM_PROMPT};
