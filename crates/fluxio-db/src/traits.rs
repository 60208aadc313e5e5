//! Task table abstraction trait

use async_trait::async_trait;
use fluxio_core::models::{TaskRecord, TaskStatus, TaskUpdate};
use thiserror::Error;
use uuid::Uuid;

/// Task table operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Task not found: {0}")]
    NotFound(Uuid),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for task table operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Task table abstraction
///
/// `update` applies a partial, single-item mutation and refreshes
/// `updated_at`; concurrent workers racing on a redelivered task converge
/// because attempts only grow and terminal writes are equivalent.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Write a full record. Used once, at submission.
    async fn put(&self, record: &TaskRecord) -> StoreResult<()>;

    /// Read the authoritative record for a task id.
    async fn get(&self, task_id: Uuid) -> StoreResult<Option<TaskRecord>>;

    /// Apply a partial update to one record.
    async fn update(&self, task_id: Uuid, update: TaskUpdate) -> StoreResult<()>;

    /// All records of one submission session, for status aggregation.
    async fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<TaskRecord>>;

    /// All records in a given status, for operational queries.
    async fn list_by_status(&self, status: TaskStatus) -> StoreResult<Vec<TaskRecord>>;
}
