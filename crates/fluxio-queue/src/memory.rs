//! In-memory queue for tests
//!
//! Models the broker semantics the worker depends on: visibility timeout
//! with redelivery, per-message receive counts, and automatic
//! dead-lettering once a message has been received `max_receive_count`
//! times without an ack. `receive` never blocks; an empty queue answers
//! `None` immediately.

use crate::traits::{Delivery, QueueError, QueueResult, TaskQueue};
use async_trait::async_trait;
use fluxio_core::models::TaskMessage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Item {
    message: TaskMessage,
    receive_count: u32,
    visible_at: Instant,
}

#[derive(Default)]
struct Inner {
    ready: VecDeque<Item>,
    inflight: HashMap<String, Item>,
    dead: Vec<TaskMessage>,
    next_receipt: u64,
}

#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Mutex<Inner>>,
    visibility: Duration,
    max_receive_count: u32,
}

impl MemoryQueue {
    pub fn new(visibility: Duration, max_receive_count: u32) -> Self {
        MemoryQueue {
            inner: Arc::new(Mutex::new(Inner::default())),
            visibility,
            max_receive_count,
        }
    }

    /// Messages the broker routed to the dead-letter queue.
    pub fn dead_letters(&self) -> Vec<TaskMessage> {
        self.inner.lock().unwrap().dead.clone()
    }

    pub fn ready_len(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        Self::reap_expired(&mut inner, self.max_receive_count);
        inner.ready.len()
    }

    pub fn inflight_len(&self) -> usize {
        self.inner.lock().unwrap().inflight.len()
    }

    /// Requeue or dead-letter claims whose visibility window has passed.
    fn reap_expired(inner: &mut Inner, max_receive_count: u32) {
        let now = Instant::now();
        let expired: Vec<String> = inner
            .inflight
            .iter()
            .filter(|(_, item)| item.visible_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in expired {
            let item = inner.inflight.remove(&receipt).unwrap();
            if item.receive_count >= max_receive_count {
                inner.dead.push(item.message);
            } else {
                inner.ready.push_back(item);
            }
        }
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn enqueue(&self, message: &TaskMessage) -> QueueResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.ready.push_back(Item {
            message: message.clone(),
            receive_count: 0,
            visible_at: Instant::now(),
        });
        Ok(())
    }

    async fn receive(&self) -> QueueResult<Option<Delivery>> {
        let mut inner = self.inner.lock().unwrap();
        Self::reap_expired(&mut inner, self.max_receive_count);

        let Some(mut item) = inner.ready.pop_front() else {
            return Ok(None);
        };
        item.receive_count += 1;
        item.visible_at = Instant::now() + self.visibility;

        inner.next_receipt += 1;
        let receipt = format!("rcpt-{}", inner.next_receipt);
        let delivery = Delivery {
            message: item.message.clone(),
            receipt: receipt.clone(),
            receive_count: item.receive_count,
            ack_deadline: self.visibility,
        };
        inner.inflight.insert(receipt, item);
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .inflight
            .remove(&delivery.receipt)
            .ok_or_else(|| QueueError::AckFailed(format!("unknown receipt {}", delivery.receipt)))?;
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let item = inner
            .inflight
            .remove(&delivery.receipt)
            .ok_or_else(|| QueueError::AckFailed(format!("unknown receipt {}", delivery.receipt)))?;
        if item.receive_count >= self.max_receive_count {
            inner.dead.push(item.message);
        } else {
            inner.ready.push_back(item);
        }
        Ok(())
    }

    async fn extend(&self, delivery: &Delivery, secs: u32) -> QueueResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let item = inner
            .inflight
            .get_mut(&delivery.receipt)
            .ok_or_else(|| QueueError::AckFailed(format!("unknown receipt {}", delivery.receipt)))?;
        item.visible_at = Instant::now() + Duration::from_secs(secs as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn message() -> TaskMessage {
        TaskMessage {
            task_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_receive_claims_and_ack_removes() {
        let queue = MemoryQueue::new(Duration::from_secs(30), 5);
        let msg = message();
        queue.enqueue(&msg).await.unwrap();

        let delivery = queue.receive().await.unwrap().unwrap();
        assert_eq!(delivery.message, msg);
        assert_eq!(delivery.receive_count, 1);
        assert_eq!(delivery.ack_deadline, Duration::from_secs(30));
        assert!(queue.receive().await.unwrap().is_none());

        queue.ack(&delivery).await.unwrap();
        assert_eq!(queue.inflight_len(), 0);
        assert!(queue.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nack_redelivers_with_incremented_count() {
        let queue = MemoryQueue::new(Duration::from_secs(30), 5);
        queue.enqueue(&message()).await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        queue.nack(&first).await.unwrap();

        let second = queue.receive().await.unwrap().unwrap();
        assert_eq!(second.receive_count, 2);
        assert_eq!(second.message, first.message);
    }

    #[tokio::test]
    async fn test_visibility_expiry_redelivers() {
        let queue = MemoryQueue::new(Duration::from_millis(10), 5);
        queue.enqueue(&message()).await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = queue.receive().await.unwrap().unwrap();
        assert_eq!(second.receive_count, 2);
        // The original receipt is stale now.
        assert!(queue.ack(&first).await.is_err());
        queue.ack(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_extend_pushes_the_deadline_out() {
        let queue = MemoryQueue::new(Duration::from_millis(10), 5);
        queue.enqueue(&message()).await.unwrap();

        let delivery = queue.receive().await.unwrap().unwrap();
        queue.extend(&delivery, 60).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Without the extension this claim would have expired by now.
        assert!(queue.receive().await.unwrap().is_none());
        queue.ack(&delivery).await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_message_goes_to_dead_letter() {
        let queue = MemoryQueue::new(Duration::from_secs(30), 2);
        let msg = message();
        queue.enqueue(&msg).await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        queue.nack(&first).await.unwrap();
        let second = queue.receive().await.unwrap().unwrap();
        assert_eq!(second.receive_count, 2);
        queue.nack(&second).await.unwrap();

        assert!(queue.receive().await.unwrap().is_none());
        assert_eq!(queue.dead_letters(), vec![msg]);
    }
}
