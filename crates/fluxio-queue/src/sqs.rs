//! SQS queue backend
//!
//! Long-polls with a single-message batch size; the worker loop is
//! sequential by design, horizontal scale comes from more processes.
//! `ApproximateReceiveCount` is requested so deliveries carry the broker's
//! own attempt count, which is what the dead-letter policy keys on.

use crate::traits::{Delivery, QueueError, QueueResult, TaskQueue};
use async_trait::async_trait;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use fluxio_core::models::TaskMessage;
use std::time::Duration;

const LONG_POLL_SECS: i32 = 20;

#[derive(Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    /// The queue's configured visibility timeout; SQS does not echo it
    /// back per message.
    ack_deadline: Duration,
}

impl SqsQueue {
    pub async fn new(queue_url: String, region: Option<String>, ack_deadline_secs: u32) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        SqsQueue {
            client: aws_sdk_sqs::Client::new(&sdk_config),
            queue_url,
            ack_deadline: Duration::from_secs(ack_deadline_secs as u64),
        }
    }
}

#[async_trait]
impl TaskQueue for SqsQueue {
    async fn enqueue(&self, message: &TaskMessage) -> QueueResult<()> {
        let body = serde_json::to_string(message)
            .map_err(|e| QueueError::EnqueueFailed(e.to_string()))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, task_id = %message.task_id, "SQS send failed");
                QueueError::EnqueueFailed(e.to_string())
            })?;

        tracing::info!(task_id = %message.task_id, "Message enqueued");
        Ok(())
    }

    async fn receive(&self) -> QueueResult<Option<Delivery>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(LONG_POLL_SECS)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };

        let body = message
            .body()
            .ok_or_else(|| QueueError::MalformedMessage("empty body".to_string()))?;
        let task_message: TaskMessage = serde_json::from_str(body)
            .map_err(|e| QueueError::MalformedMessage(format!("{}: {}", e, body)))?;

        let receipt = message
            .receipt_handle()
            .ok_or_else(|| QueueError::MalformedMessage("missing receipt handle".to_string()))?
            .to_string();

        let receive_count = message
            .attributes()
            .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(1);

        Ok(Some(Delivery {
            message: task_message,
            receipt,
            receive_count,
            ack_deadline: self.ack_deadline,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .send()
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> QueueResult<()> {
        // Visibility zero hands the message straight back to the queue.
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .visibility_timeout(0)
            .send()
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }

    async fn extend(&self, delivery: &Delivery, secs: u32) -> QueueResult<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .visibility_timeout(secs as i32)
            .send()
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }
}
