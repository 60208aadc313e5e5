use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::path::CloudPath;

/// The recognized transformation actions. Unknown actions are rejected at
/// submission and never enqueued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    ConvertH265,
    Compress,
    Rename,
}

impl Display for TaskAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskAction::ConvertH265 => write!(f, "convert_h265"),
            TaskAction::Compress => write!(f, "compress"),
            TaskAction::Rename => write!(f, "rename"),
        }
    }
}

impl FromStr for TaskAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "convert_h265" => Ok(TaskAction::ConvertH265),
            "compress" => Ok(TaskAction::Compress),
            "rename" => Ok(TaskAction::Rename),
            _ => Err(anyhow::anyhow!("Invalid task action: {}", s)),
        }
    }
}

/// Task lifecycle states. Serialized UPPERCASE to match the wire shape of
/// the task table records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    /// Terminal states never transition again; a redelivered message for a
    /// terminal task is acknowledged and discarded.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Running => write!(f, "RUNNING"),
            TaskStatus::Success => write!(f, "SUCCESS"),
            TaskStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "RUNNING" => Ok(TaskStatus::Running),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILED" => Ok(TaskStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// The queue message envelope. Authoritative state lives in the task table;
/// the message carries only the task id so the record and the queue payload
/// can never diverge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskMessage {
    pub task_id: Uuid,
}

/// A file-transformation task as stored in the task table.
///
/// Records are created once at submission and mutated only by single-item
/// updates keyed on `task_id`. They are never deleted by application code;
/// `expiration_time` drives store-side TTL garbage collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub session_id: String,
    pub status: TaskStatus,
    pub source: CloudPath,
    pub destination: CloudPath,
    pub action: TaskAction,
    pub attempts: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Epoch seconds after which the store expires the record.
    pub expiration_time: i64,
}

impl TaskRecord {
    /// Create a fresh PENDING record for a newly submitted task.
    pub fn new(
        session_id: String,
        source: CloudPath,
        destination: CloudPath,
        action: TaskAction,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        TaskRecord {
            task_id: Uuid::new_v4(),
            session_id,
            status: TaskStatus::Pending,
            source,
            destination,
            action,
            attempts: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            expiration_time: now.timestamp() + ttl_secs,
        }
    }

    /// Whether another delivery attempt is allowed after a transient failure.
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.attempts < max_attempts
    }

    pub fn message(&self) -> TaskMessage {
        TaskMessage {
            task_id: self.task_id,
        }
    }
}

/// A partial, single-item update applied to a task record. Fields left as
/// `None` are unchanged; `updated_at` is always refreshed by the store.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub attempts: Option<u32>,
    pub error_message: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        TaskUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord::new(
            "session-1".to_string(),
            CloudPath::parse("s3://in/video.mp4").unwrap(),
            CloudPath::parse("s3://out/video_h265.mp4").unwrap(),
            TaskAction::ConvertH265,
            7 * 24 * 3600,
        )
    }

    #[test]
    fn test_action_display() {
        assert_eq!(TaskAction::ConvertH265.to_string(), "convert_h265");
        assert_eq!(TaskAction::Compress.to_string(), "compress");
        assert_eq!(TaskAction::Rename.to_string(), "rename");
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!(
            "convert_h265".parse::<TaskAction>().unwrap(),
            TaskAction::ConvertH265
        );
        assert_eq!("rename".parse::<TaskAction>().unwrap(), TaskAction::Rename);
        assert!("transmogrify".parse::<TaskAction>().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Success,
            TaskStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Failed).unwrap(),
            "\"FAILED\""
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_new_record_is_pending_with_zero_attempts() {
        let record = record();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert!(record.error_message.is_none());
        assert!(record.expiration_time > record.created_at.timestamp());
    }

    #[test]
    fn test_can_retry_respects_cap() {
        let mut record = record();
        record.attempts = 4;
        assert!(record.can_retry(5));
        record.attempts = 5;
        assert!(!record.can_retry(5));
        record.attempts = 6;
        assert!(!record.can_retry(5));
    }

    #[test]
    fn test_message_carries_only_task_id() {
        let record = record();
        let message = record.message();
        assert_eq!(message.task_id, record.task_id);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["task_id"]
        );
    }
}
