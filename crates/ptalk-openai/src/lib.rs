//! OpenAI API client for the PixelTalk pipeline.
//!
//! Covers the call shapes the pipeline needs: Whisper transcription,
//! instructed text completions, vision-grounded completions, schema-bound
//! structured output, and image generation.

pub mod client;
pub mod error;
pub mod types;

pub use client::{OpenAiClient, OpenAiConfig};
pub use error::{OpenAiError, OpenAiResult};
pub use types::{Completion, GeneratedImage};
