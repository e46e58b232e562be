use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qd_models::UserId;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
}

/// Binary asset storage returning a retrievable URL per upload
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError>;
}

/// Key for a group poster: `group-posters/<uploader>/<millis>_<file name>`
pub fn poster_key(uploader: &UserId, at: DateTime<Utc>, file_name: &str) -> String {
    let base_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("poster");
    format!(
        "group-posters/{}/{}_{}",
        urlencoding::encode(uploader.as_str()),
        at.timestamp_millis(),
        urlencoding::encode(base_name)
    )
}

/// Stores blobs under a local directory and hands out `file://` URLs
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        info!("Stored {} ({} bytes, {})", key, bytes.len(), content_type);
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_poster_key_layout() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let key = poster_key(&UserId::from("alice"), at, "/home/alice/My Poster.png");
        assert_eq!(key, format!("group-posters/alice/{}_My%20Poster.png", at.timestamp_millis()));
    }

    #[tokio::test]
    async fn test_local_upload_returns_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let url = store
            .upload("group-posters/alice/1_poster.png", b"\x89PNG", "image/png")
            .await
            .unwrap();

        assert!(url.starts_with("file://"));
        let written = std::fs::read(dir.path().join("group-posters/alice/1_poster.png")).unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        for key in ["../outside.png", "/etc/passwd", ""] {
            let err = store.upload(key, b"x", "image/png").await.unwrap_err();
            assert!(matches!(err, BlobError::InvalidKey(_)), "key {:?}", key);
        }
    }
}
