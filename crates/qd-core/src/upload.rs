use crate::error::QueueError;
use qd_config::UploadConfig;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// An image the user picked as a group poster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PosterUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Build an upload whose content type is detected from the bytes
    pub fn sniff(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or(FALLBACK_CONTENT_TYPE);
        Self::new(file_name, content_type, bytes)
    }

    pub fn validate(&self, config: &UploadConfig) -> Result<(), QueueError> {
        if self.bytes.len() as u64 > config.max_poster_bytes {
            return Err(QueueError::validation(format!(
                "Poster is too large ({} bytes). The limit is {} bytes.",
                self.bytes.len(),
                config.max_poster_bytes
            )));
        }
        if !config.allowed_content_types.iter().any(|t| t == &self.content_type) {
            return Err(QueueError::validation(format!(
                "Unsupported poster type '{}'. Allowed: {}",
                self.content_type,
                config.allowed_content_types.join(", ")
            )));
        }
        Ok(())
    }
}
