//! Worker run loop and per-delivery state machine
//!
//! Per delivered message: read the authoritative record, discard
//! duplicates for terminal tasks, gate on destination bucket existence,
//! mark RUNNING with the attempt counted, download, transform under a
//! deadline strictly shorter than the broker ack deadline, upload, and
//! write the terminal status. Recoverable failures hand the message back
//! for redelivery while the attempt cap holds; everything else is a
//! permanent FAILED with the reason recorded.

use anyhow::anyhow;
use fluxio_core::models::{TaskRecord, TaskStatus, TaskUpdate};
use fluxio_core::{Config, FailureKind, TaskError, TaskResultExt};
use fluxio_db::TaskStore;
use fluxio_queue::{Delivery, TaskQueue};
use fluxio_storage::{ObjectStorage, StorageError, StorageRouter};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::executor::TransformExecutor;

#[derive(Clone, Debug)]
pub struct WorkerOptions {
    pub max_attempts: u32,
    pub executor_timeout: Duration,
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
}

impl WorkerOptions {
    pub fn from_config(config: &Config) -> Self {
        WorkerOptions {
            max_attempts: config.max_attempts,
            executor_timeout: config.executor_timeout(),
            work_dir: config.work_dir.clone(),
            poll_interval: Duration::from_millis(config.queue_poll_interval_ms),
        }
    }
}

pub struct TaskWorker {
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn TaskStore>,
    storage: StorageRouter,
    executor: Arc<dyn TransformExecutor>,
    options: WorkerOptions,
}

impl TaskWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn TaskStore>,
        storage: StorageRouter,
        executor: Arc<dyn TransformExecutor>,
        options: WorkerOptions,
    ) -> Self {
        TaskWorker {
            queue,
            store,
            storage,
            executor,
            options,
        }
    }

    /// Blocking consume loop. Runs until a shutdown signal arrives; an
    /// in-flight delivery always finishes before the loop exits.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            max_attempts = self.options.max_attempts,
            executor_timeout_secs = self.options.executor_timeout.as_secs(),
            "Worker loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Worker loop shutting down");
                    break;
                }
                received = self.queue.receive() => {
                    match received {
                        Ok(Some(delivery)) => {
                            if let Err(e) = self.process_delivery(&delivery).await {
                                tracing::error!(
                                    error = %e,
                                    task_id = %delivery.message.task_id,
                                    "Delivery processing failed"
                                );
                            }
                        }
                        Ok(None) => {
                            tokio::time::sleep(self.options.poll_interval).await;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Queue receive failed");
                            tokio::time::sleep(self.options.poll_interval).await;
                        }
                    }
                }
            }
        }

        tracing::info!("Worker loop stopped");
    }

    /// Drive one delivered message through the task state machine.
    #[tracing::instrument(
        skip(self, delivery),
        fields(task_id = %delivery.message.task_id, receive_count = delivery.receive_count)
    )]
    pub async fn process_delivery(&self, delivery: &Delivery) -> anyhow::Result<()> {
        let task_id = delivery.message.task_id;

        let Some(record) = self.store.get(task_id).await? else {
            // Poison message: no record backs it, nothing to retry.
            tracing::warn!("No record for delivered task, discarding message");
            self.queue.ack(delivery).await?;
            return Ok(());
        };

        if record.status.is_terminal() {
            // Duplicate delivery after a lost ack. The work already
            // happened; reprocessing would double-write the destination.
            tracing::info!(status = %record.status, "Duplicate delivery for terminal task, discarding");
            self.queue.ack(delivery).await?;
            return Ok(());
        }

        let attempts = record.attempts + 1;

        if let Err(error) = self.check_destination(&record).await {
            return self.conclude(delivery, &record, attempts, error).await;
        }

        self.store
            .update(
                task_id,
                TaskUpdate::status(TaskStatus::Running).with_attempts(attempts),
            )
            .await?;
        tracing::info!(attempts, action = %record.action, "Task claimed");

        match self.execute(&record).await {
            Ok(()) => {
                self.store
                    .update(task_id, TaskUpdate::status(TaskStatus::Success))
                    .await?;
                self.queue.ack(delivery).await?;
                tracing::info!(attempts, "Task completed successfully");
                Ok(())
            }
            Err(error) => self.conclude(delivery, &record, attempts, error).await,
        }
    }

    /// Destination bucket gate: a task whose output location is gone or
    /// forbidden fails permanently instead of retrying forever.
    async fn check_destination(&self, record: &TaskRecord) -> Result<(), TaskError> {
        let storage = self.storage.for_scheme(record.destination.scheme);
        match storage.bucket_exists(&record.destination.bucket).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(TaskError::unrecoverable(
                FailureKind::NotFound,
                anyhow!(
                    "destination bucket {} not found",
                    record.destination.bucket
                ),
            )),
            Err(StorageError::AccessDenied(target)) => Err(TaskError::unrecoverable(
                FailureKind::PermissionDenied,
                anyhow!("access denied on destination bucket {}", target),
            )),
            Err(other) => Err(TaskError::recoverable(FailureKind::Unknown, other)),
        }
    }

    /// Download, transform under the deadline, upload. Scratch files are
    /// named by task id so a redelivered task overwrites its own leftovers.
    async fn execute(&self, record: &TaskRecord) -> Result<(), TaskError> {
        let input_path = self.options.work_dir.join(format!(
            "input_{}{}",
            record.task_id,
            record.source.key_extension().unwrap_or("")
        ));

        self.download_source(record, &input_path).await?;

        let transform = tokio::time::timeout(
            self.options.executor_timeout,
            self.executor.run(record.action, &input_path),
        )
        .await;

        let result = match transform {
            Ok(Ok(output_path)) => {
                let upload = self.upload_result(record, &output_path).await;
                let _ = tokio::fs::remove_file(&output_path).await;
                upload
            }
            Ok(Err(error)) => Err(TaskError::recoverable(FailureKind::ProcessingFailed, error)),
            Err(_) => Err(TaskError::recoverable(
                FailureKind::Timeout,
                anyhow!(
                    "transform exceeded {}s deadline",
                    self.options.executor_timeout.as_secs()
                ),
            )),
        };

        let _ = tokio::fs::remove_file(&input_path).await;
        result
    }

    async fn download_source(
        &self,
        record: &TaskRecord,
        input_path: &Path,
    ) -> Result<(), TaskError> {
        let storage = self.storage.for_scheme(record.source.scheme);
        let mut stream = storage
            .get_stream(&record.source.bucket, &record.source.key)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(target) => TaskError::unrecoverable(
                    FailureKind::NotFound,
                    anyhow!("source object {} not found", target),
                ),
                StorageError::AccessDenied(target) => TaskError::unrecoverable(
                    FailureKind::PermissionDenied,
                    anyhow!("access denied on source {}", target),
                ),
                other => TaskError::recoverable(FailureKind::DownloadFailed, other),
            })?;

        let mut file = tokio::fs::File::create(input_path)
            .await
            .recoverable(FailureKind::DownloadFailed)?;
        let mut size: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.recoverable(FailureKind::DownloadFailed)?;
            size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .recoverable(FailureKind::DownloadFailed)?;
        }
        file.flush()
            .await
            .recoverable(FailureKind::DownloadFailed)?;

        tracing::info!(source = %record.source, size_bytes = size, "Source downloaded");
        Ok(())
    }

    async fn upload_result(
        &self,
        record: &TaskRecord,
        output_path: &Path,
    ) -> Result<(), TaskError> {
        let storage = self.storage.for_scheme(record.destination.scheme);
        let file = tokio::fs::File::open(output_path)
            .await
            .recoverable(FailureKind::UploadFailed)?;

        let written = storage
            .put_stream(
                &record.destination.bucket,
                &record.destination.key,
                Box::pin(file),
            )
            .await
            .map_err(|e| match e {
                StorageError::NotFound(target) => TaskError::unrecoverable(
                    FailureKind::NotFound,
                    anyhow!("destination bucket {} not found", target),
                ),
                StorageError::AccessDenied(target) => TaskError::unrecoverable(
                    FailureKind::PermissionDenied,
                    anyhow!("access denied on destination {}", target),
                ),
                other => TaskError::recoverable(FailureKind::UploadFailed, other),
            })?;

        tracing::info!(destination = %record.destination, size_bytes = written, "Result uploaded");
        Ok(())
    }

    /// Record the failure and decide between requeue and permanent FAILED.
    async fn conclude(
        &self,
        delivery: &Delivery,
        record: &TaskRecord,
        attempts: u32,
        error: TaskError,
    ) -> anyhow::Result<()> {
        let message = error.record_message();

        if error.is_recoverable() && attempts < self.options.max_attempts {
            tracing::warn!(
                error = %error,
                kind = %error.kind(),
                attempts,
                max_attempts = self.options.max_attempts,
                "Task attempt failed, requeueing"
            );
            self.store
                .update(
                    record.task_id,
                    TaskUpdate::status(TaskStatus::Pending)
                        .with_attempts(attempts)
                        .with_error(message),
                )
                .await?;
            // Not acked: broker redelivery drives the retry.
            self.queue.nack(delivery).await?;
        } else {
            tracing::error!(
                error = %error,
                kind = %error.kind(),
                attempts,
                recoverable = error.is_recoverable(),
                "Task failed permanently"
            );
            self.store
                .update(
                    record.task_id,
                    TaskUpdate::status(TaskStatus::Failed)
                        .with_attempts(attempts)
                        .with_error(message),
                )
                .await?;
            self.queue.ack(delivery).await?;
        }
        Ok(())
    }
}
