//! Session status handler.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use ptalk_models::GenerationResult;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Session status as reported to pollers.
#[derive(Serialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
}

/// Report the current state of a session.
///
/// Unknown session → 404. Terminal `completed` → the stored result.
/// Terminal `failed` → error message and the stage that failed, nothing
/// internal. Anything else → `processing` plus the current stage.
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let history = state.db.get_status_history(&session_id).await?;
    let latest = history
        .last()
        .ok_or_else(|| ApiError::not_found(format!("Unknown session: {}", session_id)))?;

    let response = match latest.status.as_str() {
        "completed" => {
            let result = state.db.get_result(&session_id).await?;
            StatusResponse {
                session_id,
                status: "completed".to_string(),
                stage: None,
                error: None,
                result,
            }
        }
        "failed" => {
            let (error, stage) = failure_details(latest.additional_info.as_ref());
            StatusResponse {
                session_id,
                status: "failed".to_string(),
                stage,
                error: Some(error),
                result: None,
            }
        }
        stage => StatusResponse {
            session_id,
            status: "processing".to_string(),
            stage: Some(stage.to_string()),
            error: None,
            result: None,
        },
    };

    Ok(Json(response))
}

fn failure_details(info: Option<&Value>) -> (String, Option<String>) {
    let error = info
        .and_then(|i| i.get("error"))
        .and_then(|e| e.as_str())
        .unwrap_or("Processing failed")
        .to_string();
    let stage = info
        .and_then(|i| i.get("stage"))
        .and_then(|s| s.as_str())
        .map(str::to_string);
    (error, stage)
}
