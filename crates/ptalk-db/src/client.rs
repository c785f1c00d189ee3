//! Neon Data API client.
//!
//! The Data API exposes Postgres tables through a PostgREST-style REST
//! interface: rows are addressed by query-string filters, upserts use the
//! `on_conflict` parameter with a `Prefer: resolution=merge-duplicates`
//! header. The API key is sent in the `apikey` header, with an optional JWT
//! bearer token for user-scoped access.
//!
//! Tables used:
//! - `update_status` — append-only status rows with per-session sequence numbers
//! - `update_counters` — one counter row per session (sequence assignment)
//! - `completed_results` — final result rows, upserted by session id
//! - `openai_responses` — model usage telemetry (best-effort)
//! - `sessions` — probed by `test_connection`

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info_span, warn, Instrument};

use ptalk_models::{GenerationResult, StatusUpdate, UsageRecord};

use crate::error::{DbError, DbResult};

// =============================================================================
// Configuration
// =============================================================================

/// Neon Data API client configuration.
#[derive(Debug, Clone)]
pub struct NeonConfig {
    /// Data API base URL
    pub base_url: String,
    /// API key for service-to-service calls
    pub api_key: String,
    /// Optional JWT for user-scoped access
    pub jwt_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl NeonConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DbResult<Self> {
        let base_url = std::env::var("NEON_DATA_API_URL")
            .map_err(|_| DbError::config_error("NEON_DATA_API_URL not set"))?;
        let api_key = std::env::var("NEON_API_KEY")
            .map_err(|_| DbError::config_error("NEON_API_KEY not set"))?;

        let connect_timeout_secs: u64 = std::env::var("NEON_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            jwt_token: std::env::var("NEON_JWT_TOKEN").ok(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Neon Data API client.
///
/// The system of record for session status history and generation results,
/// addressable by session id and read by the HTTP boundary independently of
/// the pipeline's in-memory state.
#[derive(Clone)]
pub struct NeonClient {
    http: Client,
    config: NeonConfig,
}

#[derive(Debug, Deserialize)]
struct CounterRow {
    count: u64,
}

impl NeonClient {
    /// Create a new client.
    pub fn new(config: NeonConfig) -> DbResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("ptalk-db/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DbError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> DbResult<Self> {
        Self::new(NeonConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.config.base_url, table)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder
            .header("apikey", &self.config.api_key)
            .header("Accept", "application/json");
        match &self.config.jwt_token {
            Some(jwt) => builder.bearer_auth(jwt),
            None => builder,
        }
    }

    // =========================================================================
    // Status updates
    // =========================================================================

    /// Append a status row for a session, assigning the next sequence number.
    ///
    /// Sequence numbers are strictly increasing per session with no gaps.
    /// The pipeline worker is the only status writer for a session during
    /// its processing lifetime, so the read-increment-write on the counter
    /// row is race-free.
    pub async fn update_status(
        &self,
        session_id: &str,
        status: &str,
        additional_info: Option<serde_json::Value>,
    ) -> DbResult<u64> {
        self.execute("update_status", async {
            let sequence_number = self.next_sequence_number(session_id).await?;

            let mut row = json!({
                "session_id": session_id,
                "status": status,
                "timestamp": Utc::now().to_rfc3339(),
                "sequence_number": sequence_number,
            });
            if let Some(info) = additional_info {
                row["additional_info"] = info;
            }

            let response = self
                .request(self.http.post(self.table_url("update_status")))
                .json(&row)
                .send()
                .await?;
            Self::ensure_success(response).await?;

            debug!(session_id, status, sequence_number, "Status updated");
            Ok(sequence_number)
        })
        .await
    }

    /// Read and bump the per-session counter row, returning the new value.
    async fn next_sequence_number(&self, session_id: &str) -> DbResult<u64> {
        let url = format!(
            "{}?session_id=eq.{}&select=count",
            self.table_url("update_counters"),
            session_id
        );
        let response = self.request(self.http.get(&url)).send().await?;
        let rows: Vec<CounterRow> = Self::parse_success(response).await?;
        let next = rows.first().map(|r| r.count + 1).unwrap_or(1);

        let url = format!(
            "{}?on_conflict=session_id",
            self.table_url("update_counters")
        );
        let response = self
            .request(self.http.post(&url))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&json!({ "session_id": session_id, "count": next }))
            .send()
            .await?;
        Self::ensure_success(response).await?;

        Ok(next)
    }

    /// Get all status updates for a session, ordered by sequence number.
    pub async fn get_status_history(&self, session_id: &str) -> DbResult<Vec<StatusUpdate>> {
        self.execute("get_status_history", async {
            let url = format!(
                "{}?session_id=eq.{}&select=*&order=sequence_number.asc",
                self.table_url("update_status"),
                session_id
            );
            let response = self.request(self.http.get(&url)).send().await?;
            Self::parse_success(response).await
        })
        .await
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Upsert the final result row for a session.
    ///
    /// Overwrites any previous row for the same session wholesale; a result
    /// is never partially written.
    pub async fn notify_result(&self, result: &GenerationResult) -> DbResult<()> {
        self.execute("notify_result", async {
            let url = format!(
                "{}?on_conflict=session_id",
                self.table_url("completed_results")
            );
            let response = self
                .request(self.http.post(&url))
                .header("Prefer", "resolution=merge-duplicates")
                .json(result)
                .send()
                .await?;
            Self::ensure_success(response).await?;

            debug!(session_id = %result.session_id, "Result stored");
            Ok(())
        })
        .await
    }

    /// Get the completed result for a session, if any.
    pub async fn get_result(&self, session_id: &str) -> DbResult<Option<GenerationResult>> {
        self.execute("get_result", async {
            let url = format!(
                "{}?session_id=eq.{}&select=*",
                self.table_url("completed_results"),
                session_id
            );
            let response = self.request(self.http.get(&url)).send().await?;
            let mut rows: Vec<GenerationResult> = Self::parse_success(response).await?;
            Ok(if rows.is_empty() {
                None
            } else {
                Some(rows.swap_remove(0))
            })
        })
        .await
    }

    // =========================================================================
    // Usage telemetry
    // =========================================================================

    /// Store a model usage row. Best-effort: failures are logged, never
    /// surfaced to the calling stage.
    pub async fn store_usage(&self, record: &UsageRecord) {
        let result = self
            .execute("store_usage", async {
                let response = self
                    .request(self.http.post(self.table_url("openai_responses")))
                    .json(record)
                    .send()
                    .await?;
                Self::ensure_success(response).await
            })
            .await;

        if let Err(e) = result {
            warn!(
                session_id = %record.session_id,
                request_type = %record.request_type,
                "Failed to store usage row: {}", e
            );
        }
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Test if the database connection is working.
    pub async fn test_connection(&self) -> bool {
        let url = format!("{}?select=session_id&limit=1", self.table_url("sessions"));
        match self.request(self.http.get(&url)).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("Database connection test failed: HTTP {}", response.status());
                false
            }
            Err(e) => {
                warn!("Database connection test failed: {}", e);
                false
            }
        }
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn ensure_success(response: reqwest::Response) -> DbResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DbError::from_http_status(status.as_u16(), body))
    }

    async fn parse_success<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> DbResult<T> {
        let status = response.status();
        if status == StatusCode::OK {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let prefix: String = body.chars().take(200).collect();
                DbError::invalid_response(format!(
                    "Failed to parse response: {} (body prefix: {})",
                    e, prefix
                ))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DbError::from_http_status(status.as_u16(), body))
        }
    }

    /// Execute a request with a tracing span and latency metric.
    async fn execute<T, F>(&self, operation: &str, fut: F) -> DbResult<T>
    where
        F: std::future::Future<Output = DbResult<T>>,
    {
        let span = info_span!("db_request", operation = %operation);
        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::histogram!(
            "ptalk_db_request_duration_ms",
            "operation" => operation.to_string(),
            "outcome" => outcome,
        )
        .record(latency_ms);

        result
    }
}
