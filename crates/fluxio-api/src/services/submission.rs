//! Submission service
//!
//! Validates each task request independently, writes the PENDING record,
//! and enqueues the `{task_id}` envelope. Partial success by construction:
//! no transaction spans tasks, and one rejected task never blocks its
//! siblings. Source existence is advisory here; the worker's own download
//! attempt is the authoritative check.

use fluxio_core::constants::MAX_REPORTED_ERRORS;
use fluxio_core::models::{BatchOutcome, TaskAction, TaskRecord, TaskRequest};
use fluxio_core::path::CloudPath;
use fluxio_core::{AppError, ErrorMetadata};
use fluxio_db::TaskStore;
use fluxio_queue::TaskQueue;
use uuid::Uuid;

use crate::state::AppState;

/// Process one submission batch. Per-task failures land in the outcome;
/// this function itself never fails.
#[tracing::instrument(skip(state, requests), fields(session_id = %session_id, task_count = requests.len()))]
pub async fn submit_batch(
    state: &AppState,
    session_id: &str,
    requests: &[TaskRequest],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (index, request) in requests.iter().enumerate() {
        match submit_one(state, session_id, request).await {
            Ok(task_id) => {
                tracing::info!(
                    task_id = %task_id,
                    source = %request.source_path,
                    action = %request.action,
                    "Task submitted"
                );
                outcome.record_success();
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    source = %request.source_path,
                    "Task rejected"
                );
                outcome.record_failure(format!("Task {}: {}", index + 1, error.client_message()));
            }
        }
    }

    if outcome.errors.len() > MAX_REPORTED_ERRORS {
        let dropped = outcome.errors.len() - MAX_REPORTED_ERRORS;
        outcome.errors.truncate(MAX_REPORTED_ERRORS);
        outcome.errors.push(format!("... and {} more", dropped));
    }
    outcome
}

async fn submit_one(
    state: &AppState,
    session_id: &str,
    request: &TaskRequest,
) -> Result<Uuid, AppError> {
    // Reject malformed input before anything is written or enqueued.
    let source = CloudPath::parse(&request.source_path)?;
    let destination = CloudPath::parse(&request.output_path)?;
    let action: TaskAction = request
        .action
        .parse()
        .map_err(|_| AppError::UnknownAction(request.action.clone()))?;

    let provider = source.scheme.provider();
    let store = state
        .stores
        .for_provider(provider)
        .map_err(|_| AppError::CloudNotConfigured(provider))?;
    let queue = state
        .queues
        .for_provider(provider)
        .map_err(|_| AppError::CloudNotConfigured(provider))?;

    let record = TaskRecord::new(
        session_id.to_string(),
        source,
        destination,
        action,
        state.config.record_ttl_secs,
    );

    // Record first, then message: a message without a record is discarded
    // by the worker, a record without a message is merely never started.
    store
        .put(&record)
        .await
        .map_err(|e| AppError::Table(e.to_string()))?;
    queue
        .enqueue(&record.message())
        .await
        .map_err(|e| AppError::Queue(e.to_string()))?;

    Ok(record.task_id)
}
