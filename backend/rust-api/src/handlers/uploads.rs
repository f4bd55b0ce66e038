use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    metrics::UPLOADS_STORED_TOTAL,
    services::{file_storage::FileStorage, AppState},
};

/// POST /api/upload - Store a multipart file and return its /uploads path.
/// The response body is the bare path string, which clients drop straight
/// into thumbnail/content fields.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let storage = FileStorage::new(&state.config.uploads_dir);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|name| name.to_string())
            .ok_or_else(|| ApiError::validation("File field is missing a filename"))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read uploaded file: {}", e)))?;

        let path = storage.store(&original_name, &bytes).await?;
        UPLOADS_STORED_TOTAL.inc();

        return Ok(Json(path));
    }

    Err(ApiError::validation("Missing multipart field \"file\""))
}
