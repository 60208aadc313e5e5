//! Submission and polling DTOs
//!
//! Request/response shapes for batch submission and session-level status
//! aggregation. Aggregation is pure: it looks only at the constituent task
//! statuses and performs no I/O.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use crate::models::task::{TaskRecord, TaskStatus};

/// One task in a submission batch, as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TaskRequest {
    /// "cloud" for an existing cloud path, "upload" for a staged upload.
    #[serde(default)]
    pub source_type: Option<String>,
    pub source_path: String,
    pub action: String,
    pub output_path: String,
}

/// Per-batch submission summary. Submission is partial-success: one bad
/// task never blocks siblings from being created and enqueued.
#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct BatchOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    pub fn record_success(&mut self) {
        self.total += 1;
        self.successful += 1;
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.total += 1;
        self.failed += 1;
        self.errors.push(error.into());
    }
}

/// One task row in a `task_status` response.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TaskStatusEntry {
    pub task_id: Uuid,
    pub source_path: String,
    pub action: String,
    pub output_path: String,
    pub status: TaskStatus,
    pub message: String,
}

impl From<&TaskRecord> for TaskStatusEntry {
    fn from(record: &TaskRecord) -> Self {
        TaskStatusEntry {
            task_id: record.task_id,
            source_path: record.source.to_string(),
            action: record.action.to_string(),
            output_path: record.destination.to_string(),
            status: record.status,
            message: record.error_message.clone().unwrap_or_default(),
        }
    }
}

/// Overall status of a submission session, computed from its task statuses.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Aggregate task statuses into a session status.
    ///
    /// The session is `Completed` when every task is terminal and none
    /// failed, `Failed` when every task is terminal and at least one
    /// failed, `Pending` while nothing has started, and `Processing`
    /// otherwise. Polling clients stop on `Completed` or `Failed`.
    pub fn aggregate(statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        let mut total = 0usize;
        let mut terminal = 0usize;
        let mut failed = 0usize;
        let mut pending = 0usize;
        for status in statuses {
            total += 1;
            if status.is_terminal() {
                terminal += 1;
            }
            if status == TaskStatus::Failed {
                failed += 1;
            }
            if status == TaskStatus::Pending {
                pending += 1;
            }
        }
        if total == 0 || pending == total {
            SessionStatus::Pending
        } else if terminal < total {
            SessionStatus::Processing
        } else if failed > 0 {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        }
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Processing => write!(f, "processing"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn test_aggregate_empty_session_is_pending() {
        assert_eq!(SessionStatus::aggregate([]), SessionStatus::Pending);
    }

    #[test]
    fn test_aggregate_all_pending() {
        assert_eq!(
            SessionStatus::aggregate([Pending, Pending]),
            SessionStatus::Pending
        );
    }

    #[test]
    fn test_aggregate_in_flight_is_processing() {
        assert_eq!(
            SessionStatus::aggregate([Success, Running]),
            SessionStatus::Processing
        );
        assert_eq!(
            SessionStatus::aggregate([Pending, Failed]),
            SessionStatus::Processing
        );
    }

    #[test]
    fn test_aggregate_all_success_is_completed() {
        assert_eq!(
            SessionStatus::aggregate([Success, Success]),
            SessionStatus::Completed
        );
    }

    #[test]
    fn test_aggregate_terminal_with_any_failure_is_failed() {
        // One failure marks the whole session failed even though the
        // other tasks succeeded.
        assert_eq!(
            SessionStatus::aggregate([Success, Failed, Success]),
            SessionStatus::Failed
        );
        assert_eq!(
            SessionStatus::aggregate([Failed, Failed]),
            SessionStatus::Failed
        );
    }

    #[test]
    fn test_batch_outcome_counts() {
        let mut outcome = BatchOutcome::default();
        outcome.record_success();
        outcome.record_failure("Invalid task action: transmogrify");
        outcome.record_success();
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.successful, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors.len(), 1);
    }
}
