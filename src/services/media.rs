use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Media types accepted for post attachments.
const POST_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "video/mp4",
    "video/webm",
];

/// Media types accepted for profile and header pictures.
const PICTURE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Stores uploaded media and hands back a public URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persists `bytes` under a unique name derived from `filename`.
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String>;
}

/// Validates post media against the attachment allow-list, by content
/// sniffing rather than trusting the declared content type.
pub fn check_post_media(bytes: &[u8]) -> Result<()> {
    check_against(bytes, POST_MEDIA_TYPES)
}

/// Validates a profile or header picture.
pub fn check_picture(bytes: &[u8]) -> Result<()> {
    check_against(bytes, PICTURE_TYPES)
}

fn check_against(bytes: &[u8], allowed: &[&str]) -> Result<()> {
    let kind = infer::get(bytes)
        .ok_or_else(|| AppError::Validation("Unsupported file type".to_string()))?;

    if !allowed.contains(&kind.mime_type()) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// A [`MediaStore`] that writes to the local filesystem. Files land in
/// `root` and are served back under `{public_base}/media/`.
pub struct LocalMediaStore {
    root: PathBuf,
    public_base: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base: String) -> Self {
        Self {
            root: root.into(),
            public_base,
        }
    }

    /// Keeps only characters that are safe in a filename.
    fn sanitize(filename: &str) -> String {
        let cleaned: String = filename
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
            .collect();
        if cleaned.is_empty() {
            "upload".to_string()
        } else {
            cleaned
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let unique_name = format!(
            "{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            Self::sanitize(filename)
        );

        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(&unique_name);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        tracing::debug!("Stored media file: {}", path.display());

        Ok(format!("{}/media/{}", self.public_base, unique_name))
    }
}
