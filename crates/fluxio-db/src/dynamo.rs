//! DynamoDB task table backend
//!
//! One item per task, keyed on `task_id`, with global secondary indexes
//! `SessionIdIndex` and `StatusIndex` for the two secondary lookups.
//! `expiration_time` is stored as epoch seconds, which is what DynamoDB's
//! TTL attribute expects. Updates build their expression from the fields
//! actually present in the `TaskUpdate` so untouched attributes survive.

use crate::traits::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use fluxio_core::models::{TaskRecord, TaskStatus, TaskUpdate};
use fluxio_core::path::CloudPath;
use std::collections::HashMap;
use uuid::Uuid;

const SESSION_INDEX: &str = "SessionIdIndex";
const STATUS_INDEX: &str = "StatusIndex";

#[derive(Clone)]
pub struct DynamoTaskStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoTaskStore {
    pub async fn new(table: String, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        DynamoTaskStore {
            client: aws_sdk_dynamodb::Client::new(&sdk_config),
            table,
        }
    }

    fn to_item(record: &TaskRecord) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::from([
            (
                "task_id".to_string(),
                AttributeValue::S(record.task_id.to_string()),
            ),
            (
                "session_id".to_string(),
                AttributeValue::S(record.session_id.clone()),
            ),
            (
                "status".to_string(),
                AttributeValue::S(record.status.to_string()),
            ),
            (
                "source".to_string(),
                AttributeValue::S(record.source.to_string()),
            ),
            (
                "destination".to_string(),
                AttributeValue::S(record.destination.to_string()),
            ),
            (
                "action".to_string(),
                AttributeValue::S(record.action.to_string()),
            ),
            (
                "attempts".to_string(),
                AttributeValue::N(record.attempts.to_string()),
            ),
            (
                "created_at".to_string(),
                AttributeValue::S(record.created_at.to_rfc3339()),
            ),
            (
                "updated_at".to_string(),
                AttributeValue::S(record.updated_at.to_rfc3339()),
            ),
            (
                "expiration_time".to_string(),
                AttributeValue::N(record.expiration_time.to_string()),
            ),
        ]);
        if let Some(ref message) = record.error_message {
            item.insert(
                "error_message".to_string(),
                AttributeValue::S(message.clone()),
            );
        }
        item
    }

    fn get_s<'a>(item: &'a HashMap<String, AttributeValue>, name: &str) -> StoreResult<&'a str> {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .map(String::as_str)
            .ok_or_else(|| StoreError::MalformedRecord(format!("missing attribute {}", name)))
    }

    fn get_n<T: std::str::FromStr>(
        item: &HashMap<String, AttributeValue>,
        name: &str,
    ) -> StoreResult<T> {
        item.get(name)
            .and_then(|value| value.as_n().ok())
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| StoreError::MalformedRecord(format!("bad numeric attribute {}", name)))
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> StoreResult<TaskRecord> {
        let parse_path = |name: &str| -> StoreResult<CloudPath> {
            CloudPath::parse(Self::get_s(item, name)?)
                .map_err(|e| StoreError::MalformedRecord(format!("{}: {}", name, e)))
        };
        let parse_time = |name: &str| -> StoreResult<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(Self::get_s(item, name)?)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::MalformedRecord(format!("{}: {}", name, e)))
        };

        Ok(TaskRecord {
            task_id: Self::get_s(item, "task_id")?
                .parse()
                .map_err(|e| StoreError::MalformedRecord(format!("task_id: {}", e)))?,
            session_id: Self::get_s(item, "session_id")?.to_string(),
            status: Self::get_s(item, "status")?
                .parse()
                .map_err(|e| StoreError::MalformedRecord(format!("status: {}", e)))?,
            source: parse_path("source")?,
            destination: parse_path("destination")?,
            action: Self::get_s(item, "action")?
                .parse()
                .map_err(|e| StoreError::MalformedRecord(format!("action: {}", e)))?,
            attempts: Self::get_n(item, "attempts")?,
            error_message: item
                .get("error_message")
                .and_then(|value| value.as_s().ok())
                .cloned(),
            created_at: parse_time("created_at")?,
            updated_at: parse_time("updated_at")?,
            expiration_time: Self::get_n(item, "expiration_time")?,
        })
    }

    async fn query_index(
        &self,
        index: &str,
        key_expression: &str,
        names: Option<HashMap<String, String>>,
        values: HashMap<String, AttributeValue>,
    ) -> StoreResult<Vec<TaskRecord>> {
        let items = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(index)
            .key_condition_expression(key_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(Some(values))
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        items.iter().map(Self::from_item).collect()
    }
}

#[async_trait]
impl TaskStore for DynamoTaskStore {
    async fn put(&self, record: &TaskRecord) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(Self::to_item(record)))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, task_id = %record.task_id, "DynamoDB put failed");
                StoreError::WriteFailed(e.to_string())
            })?;
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> StoreResult<Option<TaskRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("task_id", AttributeValue::S(task_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        output.item().map(Self::from_item).transpose()
    }

    async fn update(&self, task_id: Uuid, update: TaskUpdate) -> StoreResult<()> {
        let mut sets = vec!["updated_at = :updated_at".to_string()];
        let mut names: HashMap<String, String> = HashMap::new();
        let mut values = HashMap::from([(
            ":updated_at".to_string(),
            AttributeValue::S(Utc::now().to_rfc3339()),
        )]);

        if let Some(status) = update.status {
            // `status` is a DynamoDB reserved word.
            sets.push("#status = :status".to_string());
            names.insert("#status".to_string(), "status".to_string());
            values.insert(":status".to_string(), AttributeValue::S(status.to_string()));
        }
        if let Some(attempts) = update.attempts {
            sets.push("attempts = :attempts".to_string());
            values.insert(
                ":attempts".to_string(),
                AttributeValue::N(attempts.to_string()),
            );
        }
        if let Some(message) = update.error_message {
            sets.push("error_message = :error_message".to_string());
            values.insert(":error_message".to_string(), AttributeValue::S(message));
        }

        self.client
            .update_item()
            .table_name(&self.table)
            .key("task_id", AttributeValue::S(task_id.to_string()))
            .update_expression(format!("SET {}", sets.join(", ")))
            .set_expression_attribute_names((!names.is_empty()).then_some(names))
            .set_expression_attribute_values(Some(values))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, task_id = %task_id, "DynamoDB update failed");
                StoreError::WriteFailed(e.to_string())
            })?;
        Ok(())
    }

    async fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<TaskRecord>> {
        self.query_index(
            SESSION_INDEX,
            "session_id = :session_id",
            None,
            HashMap::from([(
                ":session_id".to_string(),
                AttributeValue::S(session_id.to_string()),
            )]),
        )
        .await
    }

    async fn list_by_status(&self, status: TaskStatus) -> StoreResult<Vec<TaskRecord>> {
        self.query_index(
            STATUS_INDEX,
            "#status = :status",
            Some(HashMap::from([(
                "#status".to_string(),
                "status".to_string(),
            )])),
            HashMap::from([(
                ":status".to_string(),
                AttributeValue::S(status.to_string()),
            )]),
        )
        .await
    }
}
