//! Representative image storage.
//!
//! Images are content-addressed: the file name is the SHA-256 of the bytes,
//! so uploading the same picture twice yields the same reference.

use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.upload_dir,
            config.image_base_url.clone(),
            config.max_image_bytes,
        )
    }

    /// Persist an uploaded image and return its public URL
    pub async fn store(&self, bytes: &[u8], content_type: Option<&str>) -> Result<String> {
        if bytes.is_empty() {
            return Err(AppError::invalid_input("Image must not be empty"));
        }
        if bytes.len() > self.max_bytes {
            tracing::warn!(
                "Image too large: {} bytes (max: {})",
                bytes.len(),
                self.max_bytes
            );
            return Err(AppError::PayloadTooLarge);
        }

        let extension = content_type.and_then(image_extension).ok_or_else(|| {
            AppError::invalid_input("Image must be a JPEG, PNG, GIF or WebP file")
        })?;
        let file_name = format!("{}.{}", hex::encode(Sha256::digest(bytes)), extension);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), bytes).await?;

        tracing::info!("Stored image {} ({} bytes)", file_name, bytes.len());

        Ok(format!("{}/{}", self.base_url, file_name))
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
