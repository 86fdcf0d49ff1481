//! Borrower photo storage on the local filesystem

use std::path::{Path, PathBuf};

use crate::{
    config::UploadsConfig,
    error::{AppError, AppResult},
};

/// Image extensions accepted from phones and desktops
pub const ALLOWED_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "webp", "heic", "heif", "gif", "bmp", "svg",
];

#[derive(Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl PhotoStore {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            max_bytes: config.max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if needed
    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot create {}: {}", self.dir.display(), e)))
    }

    /// Check size and extension; returns the lowercased extension
    pub fn validate(&self, original_name: &str, size: usize) -> AppResult<String> {
        if size > self.max_bytes {
            return Err(AppError::Validation(format!(
                "Invalid image file: file size too large, maximum allowed size is {}MB",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| {
                AppError::Validation(
                    "Invalid image file: unsupported format, allowed formats are JPG, JPEG, PNG, WEBP, HEIC, HEIF, GIF, BMP, SVG"
                        .to_string(),
                )
            })?;

        Ok(extension)
    }

    /// Validate and write an upload; returns the stored filename
    pub async fn save(&self, original_name: &str, data: &[u8]) -> AppResult<String> {
        let extension = self.validate(original_name, data.len())?;
        let filename = format!("{}.{}", uuid::Uuid::new_v4(), extension);

        self.ensure_dir().await?;
        tokio::fs::write(self.dir.join(&filename), data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to save photo {}: {}", filename, e)))?;

        tracing::debug!("Stored photo {} ({} bytes)", filename, data.len());
        Ok(filename)
    }

    /// Delete a stored photo
    pub async fn remove(&self, filename: &str) -> AppResult<()> {
        tokio::fs::remove_file(self.dir.join(filename))
            .await
            .map_err(|e| AppError::Storage(format!("Failed to remove photo {}: {}", filename, e)))
    }
}
