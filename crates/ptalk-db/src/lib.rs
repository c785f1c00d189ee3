//! Neon Data API persistence client.
//!
//! This crate provides:
//! - Status update rows with per-session sequence numbers
//! - Final result upserts keyed by session id
//! - Model usage telemetry (best-effort)
//! - Connection health probing

pub mod client;
pub mod error;

pub use client::{NeonClient, NeonConfig};
pub use error::{DbError, DbResult};
