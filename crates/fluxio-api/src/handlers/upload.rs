use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use fluxio_core::{AppError, CloudProvider};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::staging;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    /// Cloud path of the staged file, usable as a task source.
    pub path: String,
    pub session_id: String,
}

/// Stage a local file into a cloud temp area
///
/// Multipart fields: `file` (required), `upload_to` (`aws`|`gcp`,
/// required), `session_id` (generated when absent).
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File staged", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut upload_to: Option<String> = None;
    let mut session_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?;
                if data.len() > state.config.max_upload_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "{} bytes exceeds max {} bytes",
                        data.len(),
                        state.config.max_upload_bytes
                    ))
                    .into());
                }
                file = Some((filename, data));
            }
            Some("upload_to") => {
                upload_to = Some(field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read upload_to: {}", e))
                })?);
            }
            Some("session_id") => {
                session_id = Some(field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read session_id: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| AppError::MissingField("file".to_string()))?;
    let provider: CloudProvider = upload_to
        .ok_or_else(|| AppError::MissingField("upload_to".to_string()))?
        .parse()
        .map_err(|_| AppError::InvalidInput("upload_to must be aws or gcp".to_string()))?;
    let session_id = session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(fluxio_core::ids::new_session_id);

    let path = staging::stage_upload(&state, provider, &session_id, &filename, data).await?;

    Ok(Json(UploadResponse {
        success: true,
        path,
        session_id,
    }))
}
