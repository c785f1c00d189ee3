//! HTTP API for the PixelTalk backend.
//!
//! Exposes the upload, status, health, and metrics endpoints, serves
//! local-fallback media, and owns the pipeline orchestrator lifecycle.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
