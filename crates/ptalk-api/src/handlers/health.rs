//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Composite health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: String,
    pub worker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

/// Health check endpoint.
///
/// `healthy` when the database answers and the worker task is alive,
/// `degraded` when only the worker is, `unhealthy` (503) otherwise.
pub async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_ok = state.db.test_connection().await;
    let worker_ok = state.orchestrator.worker_alive().await;
    let storage = state
        .media
        .check_remote()
        .await
        .map(|ok| if ok { "ok" } else { "error" }.to_string());

    let status = if db_ok && worker_ok {
        "healthy"
    } else if worker_ok {
        "degraded"
    } else {
        "unhealthy"
    };

    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
            checks: HealthChecks {
                database: if db_ok { "ok" } else { "error" }.to_string(),
                worker: if worker_ok { "ok" } else { "error" }.to_string(),
                storage,
            },
        }),
    )
}
