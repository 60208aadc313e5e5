use std::sync::Arc;

use axum::{extract::State, Json};
use fluxio_core::models::MissingReason;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::validation;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePathRequest {
    pub path: String,
    /// Check only the bucket portion, ignoring key validity.
    #[serde(default, rename = "checkBucketOnly")]
    pub check_bucket_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidatePathResponse {
    pub success: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<MissingReason>,
}

/// Validate a cloud path against the object store
#[utoipa::path(
    post,
    path = "/api/validate_path",
    tag = "tasks",
    request_body = ValidatePathRequest,
    responses(
        (status = 200, description = "Check result", body = ValidatePathResponse),
        (status = 400, description = "Malformed path", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(path = %request.path, bucket_only = request.check_bucket_only))]
pub async fn validate_path(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ValidatePathRequest>,
) -> Result<Json<ValidatePathResponse>, HttpAppError> {
    let check =
        validation::check_path(&state.storage, &request.path, request.check_bucket_only).await?;

    Ok(Json(ValidatePathResponse {
        success: true,
        exists: check.exists,
        reason: check.reason,
    }))
}
