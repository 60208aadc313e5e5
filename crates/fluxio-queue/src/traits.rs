//! Queue abstraction trait
//!
//! At-least-once delivery with broker-side redelivery: a claimed message
//! that is neither acked nor nacked before its deadline comes back. The
//! broker's own dead-letter policy handles messages that exhaust their
//! receive budget; `max_attempts` is configured to match it so the task
//! record and the dead-lettered message always agree.

use async_trait::async_trait;
use fluxio_core::models::TaskMessage;
use std::time::Duration;
use thiserror::Error;

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Ack failed: {0}")]
    AckFailed(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// One claimed message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: TaskMessage,
    /// Broker receipt handle used to ack or change visibility.
    pub receipt: String,
    /// How many times the broker has delivered this message, this claim
    /// included. Starts at 1.
    pub receive_count: u32,
    /// Claim window: unless acked, nacked, or extended, the message
    /// redelivers this long after the claim. Any processing deadline must
    /// stay strictly inside it.
    pub ack_deadline: Duration,
}

/// Task queue abstraction
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, message: &TaskMessage) -> QueueResult<()>;

    /// Claim the next message, if any. Blocks for the backend's poll
    /// window; `None` means the queue was empty.
    async fn receive(&self) -> QueueResult<Option<Delivery>>;

    /// Remove a claimed message permanently.
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Give a claimed message back for immediate redelivery.
    async fn nack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Push a claim's deadline out by `secs` from now.
    async fn extend(&self, delivery: &Delivery, secs: u32) -> QueueResult<()>;
}
