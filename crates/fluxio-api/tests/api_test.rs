//! HTTP-level tests over in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use fluxio_api::setup::routes::setup_routes;
use fluxio_api::state::AppState;
use fluxio_core::models::{TaskStatus, TaskUpdate};
use fluxio_core::{CloudEndpoints, CloudProvider, Config};
use fluxio_db::{MemoryTaskStore, StoreRouter, TaskStore};
use fluxio_queue::{MemoryQueue, QueueRouter, TaskQueue};
use fluxio_storage::{MemoryObjectStorage, ObjectStorage, StorageRouter};
use serde_json::{json, Value};

struct TestApp {
    server: TestServer,
    queue: Arc<MemoryQueue>,
    store: Arc<MemoryTaskStore>,
    storage: MemoryObjectStorage,
}

fn test_config() -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        aws_region: Some("eu-west-1".to_string()),
        gcp_project: None,
        aws: CloudEndpoints {
            queue: Some("https://sqs.eu-west-1.amazonaws.com/1/tasks".to_string()),
            subscription: None,
            table: Some("tasks".to_string()),
            temp_bucket: Some("temp".to_string()),
        },
        gcp: CloudEndpoints::default(),
        worker_cloud: CloudProvider::Aws,
        work_dir: std::env::temp_dir(),
        ffmpeg_path: "ffmpeg".to_string(),
        max_attempts: 5,
        ack_deadline_secs: 900,
        executor_timeout_secs: 840,
        record_ttl_secs: 7 * 24 * 3600,
        max_upload_bytes: 1024 * 1024,
        queue_poll_interval_ms: 10,
    }
}

/// AWS-only deployment over memory backends.
fn setup_test_app() -> TestApp {
    let config = test_config();
    let storage = MemoryObjectStorage::with_buckets(["in", "out", "temp"]);
    let queue = Arc::new(MemoryQueue::new(Duration::from_secs(60), 5));
    let store = Arc::new(MemoryTaskStore::new());

    let queue_dyn: Arc<dyn TaskQueue> = queue.clone();
    let store_dyn: Arc<dyn TaskStore> = store.clone();
    let state = Arc::new(AppState {
        config: config.clone(),
        storage: StorageRouter::new(
            Arc::new(storage.clone()),
            Arc::new(MemoryObjectStorage::new()),
        ),
        queues: QueueRouter::new(Some(queue_dyn), None),
        stores: StoreRouter::new(Some(store_dyn), None),
    });

    let server = TestServer::new(setup_routes(&config, state)).unwrap();
    TestApp {
        server,
        queue,
        store,
        storage,
    }
}

#[tokio::test]
async fn test_health_reports_cloud_readiness() {
    let app = setup_test_app();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["aws_configured"], true);
    assert_eq!(body["gcp_configured"], false);
}

#[tokio::test]
async fn test_submit_batch_partial_success() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/api/submit_task")
        .json(&json!({
            "session_id": "session-batch",
            "tasks": [
                { "source_path": "s3://in/a.mp4", "action": "convert_h265", "output_path": "s3://out/a_h265.mp4" },
                { "source_path": "s3://in/b.mp4", "action": "transmogrify", "output_path": "s3://out/b.mp4" },
                { "source_path": "s3://in/c.mp4", "action": "compress", "output_path": "s3://out/c.zip" }
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 3);
    assert_eq!(body["successful"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["success"], true);
    assert_eq!(body["session_id"], "session-batch");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("Task 2"));

    // The siblings were created and enqueued despite the bad task.
    let records = app.store.list_by_session("session-batch").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|record| record.status == TaskStatus::Pending && record.attempts == 0));
    assert_eq!(app.queue.ready_len(), 2);
}

#[tokio::test]
async fn test_submit_rejects_malformed_paths_per_task() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/api/submit_task")
        .json(&json!({
            "tasks": [
                { "source_path": "http://in/a.mp4", "action": "rename", "output_path": "s3://out/a.mp4" },
                { "source_path": "s3://in/a.mp4", "action": "rename", "output_path": "s3://out" }
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["successful"], 0);
    assert_eq!(body["failed"], 2);
    assert_eq!(body["success"], false);
    // A session id was generated even though nothing was created.
    assert!(body["session_id"].as_str().unwrap().starts_with("session-"));
    assert_eq!(app.queue.ready_len(), 0);
}

#[tokio::test]
async fn test_submit_to_unconfigured_cloud_is_a_task_error() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/api/submit_task")
        .json(&json!({
            "tasks": [
                { "source_path": "gs://in/a.mp4", "action": "rename", "output_path": "gs://out/a.mp4" }
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["failed"], 1);
    assert!(body["errors"][0]
        .as_str()
        .unwrap()
        .contains("gcp services not configured"));
}

#[tokio::test]
async fn test_submit_empty_batch_is_rejected() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/api/submit_task")
        .json(&json!({ "tasks": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "MISSING_FIELD");
}

#[tokio::test]
async fn test_validate_path_existing_object() {
    let app = setup_test_app();
    app.storage
        .put("in", "video.mp4", Bytes::from_static(b"x"))
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://in/video.mp4" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["exists"], true);
    assert!(body.get("reason").is_none());
}

#[tokio::test]
async fn test_validate_path_distinguishes_missing_reasons() {
    let app = setup_test_app();

    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://in/absent.mp4" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["exists"], false);
    assert_eq!(body["reason"], "object_not_found");

    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://no-such-bucket/key" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["exists"], false);
    assert_eq!(body["reason"], "bucket_not_found");

    app.storage.create_bucket("locked");
    app.storage.deny_bucket("locked");
    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://locked/key" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["exists"], false);
    assert_eq!(body["reason"], "access_denied");
}

#[tokio::test]
async fn test_validate_path_without_key_is_invalid() {
    let app = setup_test_app();
    // Bucket exists, but a bucket-only path is not a valid task path.
    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://in" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_PATH");
    assert!(body["error"].as_str().unwrap().contains("object key"));
}

#[tokio::test]
async fn test_validate_path_bucket_only_ignores_key() {
    let app = setup_test_app();
    // Bucket `out` exists while `path/file.mp4` does not; bucket-only
    // validation answers for the bucket alone.
    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://out/path/file.mp4", "checkBucketOnly": true }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["exists"], true);

    let response = app
        .server
        .post("/api/validate_path")
        .json(&json!({ "path": "s3://out", "checkBucketOnly": true }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["exists"], true);
}

#[tokio::test]
async fn test_task_status_reports_failed_when_any_task_failed() {
    let app = setup_test_app();
    app.server
        .post("/api/submit_task")
        .json(&json!({
            "session_id": "session-status",
            "tasks": [
                { "source_path": "s3://in/a.mp4", "action": "rename", "output_path": "s3://out/a.mp4" },
                { "source_path": "s3://in/b.mp4", "action": "rename", "output_path": "s3://out/b.mp4" }
            ]
        }))
        .await
        .assert_status_ok();

    let records = app.store.list_by_session("session-status").await.unwrap();
    app.store
        .update(records[0].task_id, TaskUpdate::status(TaskStatus::Success))
        .await
        .unwrap();
    app.store
        .update(
            records[1].task_id,
            TaskUpdate::status(TaskStatus::Failed).with_error("processing_failed: boom"),
        )
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/task_status")
        .json(&json!({ "session_id": "session-status" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "failed");
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    let failed = tasks
        .iter()
        .find(|task| task["status"] == "FAILED")
        .unwrap();
    assert_eq!(failed["message"], "processing_failed: boom");
}

#[tokio::test]
async fn test_task_status_in_flight_session_is_processing() {
    let app = setup_test_app();
    app.server
        .post("/api/submit_task")
        .json(&json!({
            "session_id": "session-mixed",
            "tasks": [
                { "source_path": "s3://in/a.mp4", "action": "rename", "output_path": "s3://out/a.mp4" },
                { "source_path": "s3://in/b.mp4", "action": "rename", "output_path": "s3://out/b.mp4" }
            ]
        }))
        .await
        .assert_status_ok();

    let records = app.store.list_by_session("session-mixed").await.unwrap();
    app.store
        .update(records[0].task_id, TaskUpdate::status(TaskStatus::Success))
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/task_status")
        .json(&json!({ "session_id": "session-mixed" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["status"], "processing");
}

#[tokio::test]
async fn test_task_status_unknown_session_is_pending_and_empty() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/api/task_status")
        .json(&json!({ "session_id": "session-nope" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["tasks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_upload_stages_file_and_returns_cloud_path() {
    let app = setup_test_app();
    let form = MultipartForm::new()
        .add_text("upload_to", "aws")
        .add_text("session_id", "session-up")
        .add_part(
            "file",
            Part::bytes(b"frames".as_slice()).file_name("my clip.mp4"),
        );

    let response = app.server.post("/api/upload").multipart(form).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["session_id"], "session-up");
    let path = body["path"].as_str().unwrap();
    assert_eq!(path, "s3://temp/uploads/session-up/my%20clip.mp4");

    assert_eq!(
        app.storage
            .object("temp", "uploads/session-up/my%20clip.mp4"),
        Some(Bytes::from_static(b"frames"))
    );
}

#[tokio::test]
async fn test_upload_generates_session_id_when_absent() {
    let app = setup_test_app();
    let form = MultipartForm::new()
        .add_text("upload_to", "aws")
        .add_part("file", Part::bytes(b"x".as_slice()).file_name("a.bin"));

    let response = app.server.post("/api/upload").multipart(form).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["session_id"].as_str().unwrap().starts_with("session-"));
}

#[tokio::test]
async fn test_upload_to_unconfigured_cloud_fails() {
    let app = setup_test_app();
    let form = MultipartForm::new()
        .add_text("upload_to", "gcp")
        .add_part("file", Part::bytes(b"x".as_slice()).file_name("a.bin"));

    let response = app.server.post("/api/upload").multipart(form).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "CLOUD_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = setup_test_app();
    let form = MultipartForm::new().add_text("upload_to", "aws");
    let response = app.server.post("/api/upload").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "MISSING_FIELD");
}

#[tokio::test]
async fn test_responses_carry_request_id_header() {
    let app = setup_test_app();
    let response = app.server.get("/health").await;
    assert!(response.headers().get("X-Request-ID").is_some());
}
