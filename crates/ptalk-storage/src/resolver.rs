//! Media persistence with remote-first, local-fallback resolution.
//!
//! Generated media goes to R2 when a client is configured and the upload
//! succeeds; otherwise it lands on local disk and is served from the
//! application's own media route. Remote failures degrade, local write
//! failures propagate.

use std::path::PathBuf;

use tracing::{info, warn};

use ptalk_models::{MediaKind, SessionId};

use crate::client::R2Client;
use crate::error::StorageResult;

/// Where a stored object ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLocation {
    Remote,
    Local,
}

/// A persisted media object.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    /// URL the object is reachable at
    pub url: String,
    /// Whether it lives in R2 or on local disk
    pub location: MediaLocation,
}

/// Configuration for the media store.
#[derive(Debug, Clone)]
pub struct MediaStoreConfig {
    /// Root directory for local fallback files
    pub media_root: PathBuf,
    /// Base URL the application serves local media under
    pub public_base_url: String,
}

impl MediaStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            media_root: std::env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "./media".to_string())
                .into(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

/// Remote-first media store.
pub struct MediaStore {
    remote: Option<R2Client>,
    config: MediaStoreConfig,
}

impl MediaStore {
    /// Create a store. `remote` is `None` when R2 is not configured; every
    /// write then goes straight to disk.
    pub fn new(remote: Option<R2Client>, config: MediaStoreConfig) -> Self {
        Self { remote, config }
    }

    /// Whether a remote backend is configured.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Remote connectivity probe for health checks. `None` when no remote
    /// backend is configured.
    pub async fn check_remote(&self) -> Option<bool> {
        match &self.remote {
            Some(client) => Some(client.check_connectivity().await),
            None => None,
        }
    }

    /// Persist one media object for a session.
    ///
    /// Tries the remote first; a failed upload is logged and demoted to a
    /// local write. A failed local write is fatal.
    pub async fn store(
        &self,
        kind: MediaKind,
        session_id: &SessionId,
        bytes: Vec<u8>,
    ) -> StorageResult<StoredMedia> {
        if let Some(remote) = &self.remote {
            let key = remote_key(kind, session_id);
            match remote
                .upload_bytes(bytes.clone(), &key, kind.content_type())
                .await
            {
                Ok(url) => {
                    info!(session_id = %session_id, key = %key, "Stored media in R2");
                    metrics::counter!("ptalk_media_stored_total", "backend" => "remote")
                        .increment(1);
                    return Ok(StoredMedia {
                        url,
                        location: MediaLocation::Remote,
                    });
                }
                Err(e) => {
                    warn!(
                        session_id = %session_id,
                        error = %e,
                        "R2 upload failed, falling back to local disk"
                    );
                }
            }
        }

        self.store_local(kind, session_id, bytes).await
    }

    async fn store_local(
        &self,
        kind: MediaKind,
        session_id: &SessionId,
        bytes: Vec<u8>,
    ) -> StorageResult<StoredMedia> {
        let subdir = match kind {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        };
        let dir = self.config.media_root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{}", session_id, kind.extension());
        let path = dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;

        info!(session_id = %session_id, path = %path.display(), "Stored media locally");
        metrics::counter!("ptalk_media_stored_total", "backend" => "local").increment(1);

        Ok(StoredMedia {
            url: format!(
                "{}/media/{}/{}",
                self.config.public_base_url, subdir, filename
            ),
            location: MediaLocation::Local,
        })
    }
}

fn remote_key(kind: MediaKind, session_id: &SessionId) -> String {
    let stem = match kind {
        MediaKind::Image => "image",
        MediaKind::Video => "video",
    };
    format!("pixeltalk/{}/{}.{}", session_id, stem, kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_key_layout() {
        let session = SessionId::new();
        let key = remote_key(MediaKind::Image, &session);
        assert_eq!(key, format!("pixeltalk/{}/image.png", session));
        let key = remote_key(MediaKind::Video, &session);
        assert_eq!(key, format!("pixeltalk/{}/video.mp4", session));
    }
}
