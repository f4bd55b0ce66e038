use std::path::{Path, PathBuf};

use anyhow::Context;
use uuid::Uuid;

use crate::error::ApiError;

/// Extensions accepted by the upload endpoint: thumbnails plus lesson
/// content (video/pdf/text).
const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "pdf", "mp4", "webm", "txt", "md",
];

const PUBLIC_PREFIX: &str = "/uploads";

/// Local-disk file store backing `POST /api/upload`. Stored names are fresh
/// UUIDs, so client-supplied filenames never touch the filesystem beyond
/// their extension.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the uploads directory if it does not exist yet
    pub async fn ensure_root(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create uploads directory {:?}", self.root))?;
        Ok(())
    }

    /// Persist an uploaded file and return its public `/uploads/...` path
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }

        let extension = sanitized_extension(original_name)?;
        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);

        let target = self.root.join(&stored_name);
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("Failed to write uploaded file {:?}", target))?;

        tracing::info!(
            original = %original_name,
            stored = %stored_name,
            size = bytes.len(),
            "File stored"
        );

        Ok(format!("{}/{}", PUBLIC_PREFIX, stored_name))
    }
}

fn sanitized_extension(original_name: &str) -> Result<String, ApiError> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::validation("Uploaded file has no extension"))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::validation(format!(
            "File type .{} is not allowed",
            extension
        )));
    }

    Ok(extension)
}
