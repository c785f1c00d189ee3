//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use ptalk_db::NeonClient;
use ptalk_openai::OpenAiClient;
use ptalk_pipeline::{Orchestrator, PipelineContext, VideoOperations};
use ptalk_storage::{MediaStore, MediaStoreConfig, R2Client, R2Config};
use ptalk_veo::{VeoClient, VeoConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: Arc<NeonClient>,
    pub media: Arc<MediaStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Create new application state, wiring the pipeline collaborators.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let db = Arc::new(NeonClient::from_env().context("Database client init failed")?);
        let openai = Arc::new(OpenAiClient::from_env().context("OpenAI client init failed")?);

        // R2 is optional; without it media falls back to local disk.
        let remote = match R2Config::from_env() {
            Ok(r2_config) => Some(R2Client::new(r2_config)),
            Err(e) => {
                info!("R2 not configured ({}), using local media storage", e);
                None
            }
        };
        let media = Arc::new(MediaStore::new(remote, MediaStoreConfig::from_env()));

        // Veo is optional; without it video requests degrade.
        let video: Option<Arc<dyn VideoOperations>> = match VeoConfig::from_env() {
            Ok(veo_config) => match VeoClient::new(veo_config).await {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Failed to init Veo client, video generation disabled: {}", e);
                    None
                }
            },
            Err(e) => {
                info!("Veo not configured ({}), video generation disabled", e);
                None
            }
        };

        let ctx = Arc::new(PipelineContext {
            transcriber: openai.clone(),
            text: openai.clone(),
            vision: openai.clone(),
            image: openai.clone(),
            brief: openai.clone(),
            video,
            status: db.clone(),
            media: media.clone(),
            video_bucket: std::env::var("GCS_VIDEO_BUCKET").ok(),
        });

        let orchestrator = Arc::new(Orchestrator::new(ctx));

        Ok(Self {
            config,
            db,
            media,
            orchestrator,
        })
    }
}
