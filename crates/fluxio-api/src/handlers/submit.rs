use std::sync::Arc;

use axum::{extract::State, Json};
use fluxio_core::models::TaskRequest;
use fluxio_core::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::submission;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitTaskRequest {
    pub tasks: Vec<TaskRequest>,
    /// Server-generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitTaskResponse {
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub session_id: String,
}

/// Submit a batch of transformation tasks
///
/// Each task is validated, stored, and enqueued independently; the
/// response counts per-task outcomes instead of failing the batch.
#[utoipa::path(
    post,
    path = "/api/submit_task",
    tag = "tasks",
    request_body = SubmitTaskRequest,
    responses(
        (status = 200, description = "Batch processed", body = SubmitTaskResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SubmitTaskRequest>,
) -> Result<Json<SubmitTaskResponse>, HttpAppError> {
    if request.tasks.is_empty() {
        return Err(AppError::MissingField("tasks".to_string()).into());
    }

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(fluxio_core::ids::new_session_id);

    let outcome = submission::submit_batch(&state, &session_id, &request.tasks).await;

    Ok(Json(SubmitTaskResponse {
        success: outcome.successful > 0,
        total: outcome.total,
        successful: outcome.successful,
        failed: outcome.failed,
        errors: outcome.errors,
        session_id,
    }))
}
