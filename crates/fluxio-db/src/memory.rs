//! In-memory task store for tests
//!
//! Models the one store behavior the orchestrator relies on beyond plain
//! CRUD: TTL expiry. A record whose `expiration_time` has passed is gone,
//! exactly as if the backing table had garbage-collected it.

use crate::traits::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use chrono::Utc;
use fluxio_core::models::{TaskRecord, TaskStatus, TaskUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryTaskStore {
    records: Arc<Mutex<HashMap<Uuid, TaskRecord>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn expired(record: &TaskRecord) -> bool {
        record.expiration_time <= Utc::now().timestamp()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn put(&self, record: &TaskRecord) -> StoreResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.task_id, record.clone());
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> StoreResult<Option<TaskRecord>> {
        let mut records = self.records.lock().unwrap();
        match records.get(&task_id) {
            Some(record) if Self::expired(record) => {
                records.remove(&task_id);
                Ok(None)
            }
            Some(record) => Ok(Some(record.clone())),
            None => Ok(None),
        }
    }

    async fn update(&self, task_id: Uuid, update: TaskUpdate) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&task_id)
            .ok_or(StoreError::NotFound(task_id))?;
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(attempts) = update.attempts {
            record.attempts = attempts;
        }
        if let Some(message) = update.error_message {
            record.error_message = Some(message);
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<TaskRecord>> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<TaskRecord> = records
            .values()
            .filter(|record| record.session_id == session_id && !Self::expired(record))
            .cloned()
            .collect();
        matched.sort_by_key(|record| record.created_at);
        Ok(matched)
    }

    async fn list_by_status(&self, status: TaskStatus) -> StoreResult<Vec<TaskRecord>> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<TaskRecord> = records
            .values()
            .filter(|record| record.status == status && !Self::expired(record))
            .cloned()
            .collect();
        matched.sort_by_key(|record| record.created_at);
        Ok(matched)
    }
}
