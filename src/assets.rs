use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::AppError, models::UploadedAsset};

/// Local bookkeeping for uploads (`<file_id><ext>`) and generated ads.
pub struct AssetStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

/// Client supplied ids are UUIDs; anything else never reaches the filesystem.
pub fn validate_file_id(file_id: &str) -> Result<(), AppError> {
    Uuid::parse_str(file_id)
        .map(|_| ())
        .map_err(|_| AppError::InvalidInput(format!("file_id must be a UUID, got {file_id:?}")))
}

/// Keeps letters, digits and dashes; everything else becomes `-`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() { "ad".to_string() } else { cleaned.chars().take(48).collect() }
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

impl AssetStore {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self { upload_dir: upload_dir.into(), output_dir: output_dir.into() }
    }

    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await
    }

    pub async fn save_upload(&self, original_filename: &str, data: &[u8]) -> Result<UploadedAsset, AppError> {
        let file_id = Uuid::new_v4().to_string();
        let extension = extension_of(original_filename);
        let filename = format!("{file_id}{extension}");
        let local_path = self.upload_dir.join(&filename);
        tokio::fs::write(&local_path, data).await?;
        info!("📁 Image uploaded: {} ({} bytes)", local_path.display(), data.len());
        Ok(UploadedAsset {
            file_id,
            filename,
            extension,
            local_path,
            object_key: None,
            uploaded_at: Utc::now(),
        })
    }

    /// Finds the uploaded file whose stem is exactly `file_id`.
    pub async fn find_upload(&self, file_id: &str) -> Result<PathBuf, AppError> {
        validate_file_id(file_id)?;
        self.uploads_for(file_id)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| AppError::AssetNotFound("Uploaded image not found".into()))
    }

    async fn uploads_for(&self, file_id: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.upload_dir).await else {
            return found;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(file_id) {
                found.push(path);
            }
        }
        found.sort();
        found
    }

    /// Best effort: returns how many local files were removed.
    pub async fn cleanup(&self, file_id: &str) -> usize {
        let mut removed = 0;
        for path in self.uploads_for(file_id).await {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("🧹 Cleaned up: {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Allocates `<product>_<brand>_<uuid>.<ext>` inside the output directory.
    pub fn output_target(&self, product: &str, brand: &str, ext: &str) -> (String, PathBuf) {
        let filename = format!(
            "{}_{}_{}.{}",
            sanitize_component(product),
            sanitize_component(brand),
            Uuid::new_v4(),
            ext
        );
        let path = self.output_dir.join(&filename);
        (filename, path)
    }

    pub async fn save_output(&self, path: &Path, data: &[u8]) -> Result<(), AppError> {
        tokio::fs::write(path, data).await?;
        info!("💾 Image saved successfully: {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    /// Resolves a download name to a path in the output directory. Rejects traversal attempts.
    pub fn output_path(&self, filename: &str) -> Result<PathBuf, AppError> {
        let plain = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && !filename.contains("..");
        if !plain {
            return Err(AppError::InvalidInput(format!("invalid filename {filename:?}")));
        }
        Ok(self.output_dir.join(filename))
    }
}
