//! Vertex AI Veo REST client.
//!
//! Veo renders video through a long-running operation: one submit call
//! returns an operation name, and the caller polls a fetch endpoint until
//! the operation reports done. This client owns both halves plus the
//! bounded wait loop between them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::error::{VeoError, VeoResult};
use crate::token_cache::TokenCache;
use crate::types::{
    FetchOperationRequest, OperationHandle, PredictParameters, PredictRequest, PromptInstance,
    VideoPollOutcome, VideoRequest,
};

// =============================================================================
// Configuration
// =============================================================================

/// Veo client configuration.
#[derive(Debug, Clone)]
pub struct VeoConfig {
    /// GCP project id
    pub project_id: String,
    /// Vertex AI region
    pub location: String,
    /// Veo model id
    pub model: String,
    /// API base URL (overridable for tests)
    pub api_base: String,
    /// Delay between polls of a running operation
    pub poll_interval: Duration,
    /// Total wait budget per operation
    pub timeout: Duration,
}

impl VeoConfig {
    /// Create config from environment variables.
    ///
    /// Returns `ConfigError` when `GCP_PROJECT_ID` is absent; callers treat
    /// that as "video generation unavailable", not a startup failure.
    pub fn from_env() -> VeoResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .map_err(|_| VeoError::config_error("GCP_PROJECT_ID not set"))?;
        let location =
            std::env::var("GCP_LOCATION").unwrap_or_else(|_| "us-central1".to_string());

        let api_base = std::env::var("VERTEX_API_BASE").unwrap_or_else(|_| {
            format!("https://{}-aiplatform.googleapis.com/v1", location)
        });

        Ok(Self {
            project_id,
            location,
            model: std::env::var("VEO_MODEL")
                .unwrap_or_else(|_| "veo-3.0-generate-preview".to_string()),
            api_base: api_base.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(
                std::env::var("VEO_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            timeout: Duration::from_secs(
                std::env::var("VEO_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(90),
            ),
        })
    }

    fn model_endpoint(&self, verb: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.api_base, self.project_id, self.location, self.model, verb
        )
    }
}

// =============================================================================
// Client
// =============================================================================

/// Veo REST API client.
pub struct VeoClient {
    http: Client,
    config: VeoConfig,
    token_cache: Arc<TokenCache>,
}

impl VeoClient {
    /// Create a new client with application-default credentials.
    pub async fn new(config: VeoConfig) -> VeoResult<Self> {
        let auth = gcp_auth::provider()
            .await
            .map_err(|e| VeoError::auth_error(format!("Failed to init GCP auth: {}", e)))?;
        Ok(Self::with_token_cache(
            config,
            Arc::new(TokenCache::new(auth)),
        ))
    }

    /// Create a client with an explicit token cache. Used by tests.
    pub fn with_token_cache(config: VeoConfig, token_cache: Arc<TokenCache>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("ptalk-veo/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            config,
            token_cache,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> VeoResult<Self> {
        Self::new(VeoConfig::from_env()?).await
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Submit a generation request. Returns the operation name to poll.
    pub async fn submit(&self, request: &VideoRequest) -> VeoResult<String> {
        let url = self.config.model_endpoint("predictLongRunning");

        let body = PredictRequest {
            instances: vec![PromptInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                aspect_ratio: request.aspect_ratio.clone(),
                duration_seconds: request.duration_seconds,
                resolution: request.resolution.clone(),
                person_generation: request.person_generation.clone(),
                sample_count: request.sample_count,
                storage_uri: request.storage_uri.clone(),
                negative_prompt: request.negative_prompt.clone(),
                seed: request.seed,
            },
        };

        let response: serde_json::Value = self.post_json(&url, &body).await?;
        let name = response
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VeoError::invalid_response("No operation name in submit response"))?
            .to_string();

        info!(operation = %name, "Submitted video generation operation");
        metrics::counter!("ptalk_veo_operations_submitted_total").increment(1);
        Ok(name)
    }

    /// Fetch the current state of an operation.
    pub async fn poll(&self, operation_name: &str) -> VeoResult<OperationHandle> {
        let url = self.config.model_endpoint("fetchPredictOperation");
        let body = FetchOperationRequest {
            operation_name: operation_name.to_string(),
        };
        self.post_json(&url, &body).await
    }

    /// Poll an operation until it completes or the wait budget is exhausted.
    ///
    /// Individual poll failures are logged and treated as "still running";
    /// only a terminal operation error is fatal. A timed-out wait is a
    /// normal outcome, not an error.
    pub async fn await_completion(&self, operation_name: &str) -> VeoResult<VideoPollOutcome> {
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.config.timeout {
                warn!(
                    operation = %operation_name,
                    waited_secs = started.elapsed().as_secs(),
                    "Video operation still running after wait budget"
                );
                metrics::counter!("ptalk_veo_operations_timed_out_total").increment(1);
                return Ok(VideoPollOutcome::TimedOut {
                    operation_name: operation_name.to_string(),
                });
            }

            match self.poll(operation_name).await {
                Ok(op) if op.done => {
                    if let Some(err) = op.error {
                        metrics::counter!("ptalk_veo_operations_failed_total").increment(1);
                        return Err(VeoError::operation_failed(format!(
                            "code {}: {}",
                            err.code, err.message
                        )));
                    }

                    let video = op
                        .response
                        .and_then(|r| r.videos.into_iter().next())
                        .ok_or_else(|| {
                            VeoError::invalid_response("Operation done but no videos returned")
                        })?;

                    info!(
                        operation = %operation_name,
                        elapsed_secs = started.elapsed().as_secs(),
                        has_gcs_uri = video.gcs_uri.is_some(),
                        "Video operation completed"
                    );
                    metrics::histogram!("ptalk_veo_operation_duration_seconds")
                        .record(started.elapsed().as_secs_f64());

                    return Ok(VideoPollOutcome::Completed {
                        gcs_uri: video.gcs_uri,
                        bytes_base64: video.bytes_base64_encoded,
                        mime_type: video.mime_type,
                    });
                }
                Ok(_) => {
                    debug!(operation = %operation_name, "Video operation still running");
                }
                Err(e) => {
                    // Transient poll failures do not abort the wait.
                    warn!(operation = %operation_name, error = %e, "Poll failed, will retry");
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Submit a request and wait for it to finish.
    pub async fn generate(&self, request: &VideoRequest) -> VeoResult<VideoPollOutcome> {
        let operation = self.submit(request).await?;
        self.await_completion(&operation).await
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> VeoResult<T> {
        let mut token = self.token_cache.get_token().await?;
        let mut response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;
        let mut status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            token = self.token_cache.get_token().await?;
            response = self
                .http
                .post(url)
                .bearer_auth(&token)
                .json(body)
                .send()
                .await?;
            status = response.status();
        }

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(VeoError::RequestFailed {
                status: status.as_u16(),
                body: body_text,
            });
        }

        Ok(response.json().await?)
    }
}
