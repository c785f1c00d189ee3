//! Shared data models for the PixelTalk backend.
//!
//! This crate provides Serde-serializable types for:
//! - Audio jobs and generation modes
//! - Pipeline stages and per-stage timing records
//! - The structured video brief and its deterministic flattening
//! - Generation results and status update rows
//! - Model token usage telemetry

pub mod brief;
pub mod job;
pub mod result;
pub mod stage;
pub mod status;
pub mod usage;

pub use brief::{BriefError, VideoBrief};
pub use job::{AudioJob, GenerationMode, SessionId};
pub use result::{GenerationResult, MediaKind, ResultStatus};
pub use stage::{Stage, StageTimings};
pub use status::StatusUpdate;
pub use usage::{TokenUsage, UsageRecord};
