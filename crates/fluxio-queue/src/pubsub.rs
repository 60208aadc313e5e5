//! Pub/Sub queue backend over REST
//!
//! Publishes to a topic and pulls from its subscription. The payload is
//! the same `{task_id}` envelope as SQS, base64-wrapped the way Pub/Sub
//! requires. `deliveryAttempt` is only populated when the subscription has
//! a dead-letter policy, which the reference deployment configures; when
//! absent the count defaults to 1.

use crate::traits::{Delivery, QueueError, QueueResult, TaskQueue};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use fluxio_core::models::TaskMessage;
use fluxio_core::GcpAuth;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const PUBSUB_BASE: &str = "https://pubsub.googleapis.com/v1";

#[derive(Clone)]
pub struct PubSubQueue {
    http: reqwest::Client,
    auth: GcpAuth,
    project: String,
    topic: String,
    subscription: String,
    /// The subscription's configured ack deadline.
    ack_deadline: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceivedMessage {
    ack_id: String,
    #[serde(default)]
    delivery_attempt: Option<u32>,
    message: PubSubMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubSubMessage {
    #[serde(default)]
    data: String,
}

impl PubSubQueue {
    pub fn new(
        project: String,
        topic: String,
        subscription: String,
        ack_deadline_secs: u32,
    ) -> Self {
        PubSubQueue {
            http: reqwest::Client::new(),
            auth: GcpAuth::new(),
            project,
            topic,
            subscription,
            ack_deadline: Duration::from_secs(ack_deadline_secs as u64),
        }
    }

    async fn post(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let token = self.auth.token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Pub/Sub returned {}: {}", status, text);
        }
        Ok(response)
    }

    fn topic_url(&self, verb: &str) -> String {
        format!(
            "{}/projects/{}/topics/{}:{}",
            PUBSUB_BASE, self.project, self.topic, verb
        )
    }

    fn subscription_url(&self, verb: &str) -> String {
        format!(
            "{}/projects/{}/subscriptions/{}:{}",
            PUBSUB_BASE, self.project, self.subscription, verb
        )
    }
}

#[async_trait]
impl TaskQueue for PubSubQueue {
    async fn enqueue(&self, message: &TaskMessage) -> QueueResult<()> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| QueueError::EnqueueFailed(e.to_string()))?;
        let body = json!({
            "messages": [{ "data": BASE64.encode(payload) }]
        });

        self.post(&self.topic_url("publish"), body)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, task_id = %message.task_id, "Pub/Sub publish failed");
                QueueError::EnqueueFailed(e.to_string())
            })?;

        tracing::info!(task_id = %message.task_id, "Message enqueued");
        Ok(())
    }

    async fn receive(&self) -> QueueResult<Option<Delivery>> {
        let body = json!({ "maxMessages": 1, "returnImmediately": false });
        let response = self
            .post(&self.subscription_url("pull"), body)
            .await
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        let pulled: PullResponse = response
            .json()
            .await
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        let Some(received) = pulled.received_messages.into_iter().next() else {
            return Ok(None);
        };

        let decoded = BASE64
            .decode(&received.message.data)
            .map_err(|e| QueueError::MalformedMessage(e.to_string()))?;
        let task_message: TaskMessage = serde_json::from_slice(&decoded)
            .map_err(|e| QueueError::MalformedMessage(e.to_string()))?;

        Ok(Some(Delivery {
            message: task_message,
            receipt: received.ack_id,
            receive_count: received.delivery_attempt.unwrap_or(1),
            ack_deadline: self.ack_deadline,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let body = json!({ "ackIds": [delivery.receipt] });
        self.post(&self.subscription_url("acknowledge"), body)
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> QueueResult<()> {
        // Deadline zero is Pub/Sub's nack: the message redelivers at once.
        let body = json!({ "ackIds": [delivery.receipt], "ackDeadlineSeconds": 0 });
        self.post(&self.subscription_url("modifyAckDeadline"), body)
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }

    async fn extend(&self, delivery: &Delivery, secs: u32) -> QueueResult<()> {
        let body = json!({ "ackIds": [delivery.receipt], "ackDeadlineSeconds": secs });
        self.post(&self.subscription_url("modifyAckDeadline"), body)
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }
}
