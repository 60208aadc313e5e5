//! Status aggregation service
//!
//! Pure read: collects a session's records from every configured task
//! table (a session may span clouds) and folds their statuses into the
//! overall session status. Safe to poll arbitrarily often.

use fluxio_core::models::{SessionStatus, TaskStatusEntry};
use fluxio_core::AppError;
use fluxio_db::TaskStore;

use crate::state::AppState;

pub struct SessionReport {
    pub status: SessionStatus,
    pub tasks: Vec<TaskStatusEntry>,
}

#[tracing::instrument(skip(state))]
pub async fn session_status(state: &AppState, session_id: &str) -> Result<SessionReport, AppError> {
    let mut records = Vec::new();
    for store in state.stores.configured() {
        records.extend(
            store
                .list_by_session(session_id)
                .await
                .map_err(|e| AppError::Table(e.to_string()))?,
        );
    }
    records.sort_by_key(|record| record.created_at);

    let status = SessionStatus::aggregate(records.iter().map(|record| record.status));
    let tasks = records.iter().map(TaskStatusEntry::from).collect();

    tracing::debug!(task_count = records.len(), status = %status, "Session status computed");
    Ok(SessionReport { status, tasks })
}
