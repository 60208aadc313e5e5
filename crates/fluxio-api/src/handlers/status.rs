use std::sync::Arc;

use axum::{extract::State, Json};
use fluxio_core::models::{SessionStatus, TaskStatusEntry};
use fluxio_core::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::status;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskStatusRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskStatusResponse {
    pub success: bool,
    pub status: SessionStatus,
    pub tasks: Vec<TaskStatusEntry>,
}

/// Poll the status of a submission session
#[utoipa::path(
    post,
    path = "/api/task_status",
    tag = "tasks",
    request_body = TaskStatusRequest,
    responses(
        (status = 200, description = "Session status", body = TaskStatusResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(session_id = %request.session_id))]
pub async fn task_status(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<TaskStatusRequest>,
) -> Result<Json<TaskStatusResponse>, HttpAppError> {
    if request.session_id.is_empty() {
        return Err(AppError::MissingField("session_id".to_string()).into());
    }

    let report = status::session_status(&state, &request.session_id).await?;

    Ok(Json(TaskStatusResponse {
        success: true,
        status: report.status,
        tasks: report.tasks,
    }))
}
