//! Firestore task table backend over REST
//!
//! One document per task under a single collection, named by `task_id`.
//! `expiration_time` is written as a timestamp because Firestore TTL
//! policies key on timestamp fields; the record still carries epoch
//! seconds. Partial updates go through `updateMask` so untouched fields
//! survive, mirroring the DynamoDB update expressions.

use crate::traits::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use fluxio_core::models::{TaskRecord, TaskStatus, TaskUpdate};
use fluxio_core::path::CloudPath;
use fluxio_core::GcpAuth;
use serde_json::{json, Map, Value};
use uuid::Uuid;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";

#[derive(Clone)]
pub struct FirestoreTaskStore {
    http: reqwest::Client,
    auth: GcpAuth,
    project: String,
    collection: String,
}

fn string_value(value: impl Into<String>) -> Value {
    json!({ "stringValue": value.into() })
}

fn integer_value(value: i64) -> Value {
    // Firestore integers travel as strings.
    json!({ "integerValue": value.to_string() })
}

fn timestamp_value(value: DateTime<Utc>) -> Value {
    json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

fn field_str<'a>(fields: &'a Value, name: &str) -> StoreResult<&'a str> {
    fields[name]["stringValue"]
        .as_str()
        .ok_or_else(|| StoreError::MalformedRecord(format!("missing field {}", name)))
}

fn field_int(fields: &Value, name: &str) -> StoreResult<i64> {
    fields[name]["integerValue"]
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| StoreError::MalformedRecord(format!("bad integer field {}", name)))
}

fn field_ts(fields: &Value, name: &str) -> StoreResult<DateTime<Utc>> {
    fields[name]["timestampValue"]
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| StoreError::MalformedRecord(format!("bad timestamp field {}", name)))
}

impl FirestoreTaskStore {
    pub fn new(project: String, collection: String) -> Self {
        FirestoreTaskStore {
            http: reqwest::Client::new(),
            auth: GcpAuth::new(),
            project,
            collection,
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_BASE, self.project
        )
    }

    fn doc_url(&self, task_id: Uuid) -> String {
        format!("{}/{}/{}", self.documents_url(), self.collection, task_id)
    }

    async fn bearer(&self) -> StoreResult<String> {
        self.auth
            .token()
            .await
            .map_err(|e| StoreError::ConfigError(e.to_string()))
    }

    fn encode_fields(record: &TaskRecord) -> Value {
        let mut fields = Map::new();
        fields.insert(
            "task_id".to_string(),
            string_value(record.task_id.to_string()),
        );
        fields.insert(
            "session_id".to_string(),
            string_value(record.session_id.clone()),
        );
        fields.insert("status".to_string(), string_value(record.status.to_string()));
        fields.insert("source".to_string(), string_value(record.source.to_string()));
        fields.insert(
            "destination".to_string(),
            string_value(record.destination.to_string()),
        );
        fields.insert("action".to_string(), string_value(record.action.to_string()));
        fields.insert(
            "attempts".to_string(),
            integer_value(record.attempts as i64),
        );
        if let Some(ref message) = record.error_message {
            fields.insert("error_message".to_string(), string_value(message.clone()));
        }
        fields.insert("created_at".to_string(), timestamp_value(record.created_at));
        fields.insert("updated_at".to_string(), timestamp_value(record.updated_at));
        fields.insert(
            "expiration_time".to_string(),
            timestamp_value(Utc.timestamp_opt(record.expiration_time, 0).single().unwrap_or_else(Utc::now)),
        );
        Value::Object(fields)
    }

    fn decode_fields(fields: &Value) -> StoreResult<TaskRecord> {
        let parse_path = |name: &str| -> StoreResult<CloudPath> {
            CloudPath::parse(field_str(fields, name)?)
                .map_err(|e| StoreError::MalformedRecord(format!("{}: {}", name, e)))
        };

        Ok(TaskRecord {
            task_id: field_str(fields, "task_id")?
                .parse()
                .map_err(|e| StoreError::MalformedRecord(format!("task_id: {}", e)))?,
            session_id: field_str(fields, "session_id")?.to_string(),
            status: field_str(fields, "status")?
                .parse()
                .map_err(|e| StoreError::MalformedRecord(format!("status: {}", e)))?,
            source: parse_path("source")?,
            destination: parse_path("destination")?,
            action: field_str(fields, "action")?
                .parse()
                .map_err(|e| StoreError::MalformedRecord(format!("action: {}", e)))?,
            attempts: field_int(fields, "attempts")? as u32,
            error_message: fields["error_message"]["stringValue"]
                .as_str()
                .map(String::from),
            created_at: field_ts(fields, "created_at")?,
            updated_at: field_ts(fields, "updated_at")?,
            expiration_time: field_ts(fields, "expiration_time")?.timestamp(),
        })
    }

    async fn run_query(&self, field: &str, value: &str) -> StoreResult<Vec<TaskRecord>> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": { "stringValue": value }
                    }
                }
            }
        });

        let token = self.bearer().await?;
        let response = self
            .http
            .post(format!("{}:runQuery", self.documents_url()))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::QueryFailed(format!("{}: {}", status, text)));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(|doc| Self::decode_fields(&doc["fields"]))
            .collect()
    }
}

#[async_trait]
impl TaskStore for FirestoreTaskStore {
    async fn put(&self, record: &TaskRecord) -> StoreResult<()> {
        let token = self.bearer().await?;
        let body = json!({ "fields": Self::encode_fields(record) });

        let response = self
            .http
            .patch(self.doc_url(record.task_id))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(task_id = %record.task_id, status = %status, "Firestore put failed");
            return Err(StoreError::WriteFailed(format!("{}: {}", status, text)));
        }
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> StoreResult<Option<TaskRecord>> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.doc_url(task_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::ReadFailed(format!("{}: {}", status, text)));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Self::decode_fields(&document["fields"]).map(Some)
    }

    async fn update(&self, task_id: Uuid, update: TaskUpdate) -> StoreResult<()> {
        let mut fields = Map::new();
        let mut mask = vec![("updateMask.fieldPaths", "updated_at".to_string())];
        fields.insert("updated_at".to_string(), timestamp_value(Utc::now()));

        if let Some(status) = update.status {
            fields.insert("status".to_string(), string_value(status.to_string()));
            mask.push(("updateMask.fieldPaths", "status".to_string()));
        }
        if let Some(attempts) = update.attempts {
            fields.insert("attempts".to_string(), integer_value(attempts as i64));
            mask.push(("updateMask.fieldPaths", "attempts".to_string()));
        }
        if let Some(message) = update.error_message {
            fields.insert("error_message".to_string(), string_value(message));
            mask.push(("updateMask.fieldPaths", "error_message".to_string()));
        }

        let token = self.bearer().await?;
        let body = json!({ "fields": Value::Object(fields) });
        let response = self
            .http
            .patch(self.doc_url(task_id))
            .query(&mask)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(task_id = %task_id, status = %status, "Firestore update failed");
            return Err(StoreError::WriteFailed(format!("{}: {}", status, text)));
        }
        Ok(())
    }

    async fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<TaskRecord>> {
        self.run_query("session_id", session_id).await
    }

    async fn list_by_status(&self, status: TaskStatus) -> StoreResult<Vec<TaskRecord>> {
        self.run_query("status", &status.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxio_core::models::TaskAction;

    fn record() -> TaskRecord {
        TaskRecord::new(
            "session-1".to_string(),
            CloudPath::parse("gs://in/video.mp4").unwrap(),
            CloudPath::parse("gs://out/video.zip").unwrap(),
            TaskAction::Compress,
            3600,
        )
    }

    #[test]
    fn test_fields_round_trip() {
        let record = record();
        let fields = FirestoreTaskStore::encode_fields(&record);
        let decoded = FirestoreTaskStore::decode_fields(&fields).unwrap();
        assert_eq!(decoded.task_id, record.task_id);
        assert_eq!(decoded.status, record.status);
        assert_eq!(decoded.source, record.source);
        assert_eq!(decoded.destination, record.destination);
        assert_eq!(decoded.attempts, record.attempts);
        assert_eq!(decoded.expiration_time, record.expiration_time);
        assert!(decoded.error_message.is_none());
    }

    #[test]
    fn test_integers_travel_as_strings() {
        let fields = FirestoreTaskStore::encode_fields(&record());
        assert_eq!(fields["attempts"]["integerValue"], json!("0"));
        assert!(fields["expiration_time"]["timestampValue"].is_string());
    }
}
