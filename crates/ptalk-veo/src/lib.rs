//! Vertex AI Veo client for the PixelTalk pipeline.
//!
//! Wraps the predictLongRunning / fetchPredictOperation pair behind a
//! bounded wait loop, with cached OAuth tokens for Vertex AI.

pub mod client;
pub mod error;
pub mod token_cache;
pub mod types;

pub use client::{VeoClient, VeoConfig};
pub use error::{VeoError, VeoResult};
pub use token_cache::TokenCache;
pub use types::{OperationHandle, VideoPollOutcome, VideoRequest};
