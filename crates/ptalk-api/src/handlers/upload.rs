//! Audio upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use ptalk_models::{AudioJob, GenerationMode, SessionId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Accepted audio container extensions.
const ALLOWED_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".m4a", ".webm", ".ogg"];

#[derive(Serialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub status: String,
    pub generation_mode: String,
}

/// Accept an audio upload and enqueue it for processing.
///
/// Multipart fields: `file` (required audio), `generation_mode`
/// (optional, defaults to `image`). Validation failures reject with 400
/// before anything is enqueued.
pub async fn upload_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut audio: Option<(Vec<u8>, String)> = None;
    let mut mode = GenerationMode::Image;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| ApiError::bad_request("File field has no filename"))?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                audio = Some((bytes.to_vec(), filename));
            }
            Some("generation_mode") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read mode: {}", e)))?;
                mode = value.parse().map_err(ApiError::BadRequest)?;
            }
            _ => {}
        }
    }

    let (bytes, filename) = audio.ok_or_else(|| ApiError::bad_request("Missing file field"))?;

    validate_extension(&filename)?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }

    let session_id = SessionId::new();
    info!(
        session_id = %session_id,
        filename = %filename,
        bytes = bytes.len(),
        mode = %mode,
        "Accepted audio upload"
    );

    state
        .orchestrator
        .enqueue(AudioJob::new(session_id.clone(), bytes, filename, mode))?;

    Ok(Json(UploadResponse {
        session_id: session_id.to_string(),
        status: "processing".to_string(),
        generation_mode: mode.to_string(),
    }))
}

fn validate_extension(filename: &str) -> ApiResult<()> {
    let lower = filename.to_lowercase();
    if ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Unsupported file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_allowlist() {
        assert!(validate_extension("clip.wav").is_ok());
        assert!(validate_extension("CLIP.MP3").is_ok());
        assert!(validate_extension("voice.m4a").is_ok());
        assert!(validate_extension("note.webm").is_ok());
        assert!(validate_extension("note.ogg").is_ok());
        assert!(validate_extension("movie.mp4").is_err());
        assert!(validate_extension("noextension").is_err());
    }
}
