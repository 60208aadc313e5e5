//! Fluxio Queue Library
//!
//! Task dispatch over the two cloud ecosystems' brokers, at-least-once.
//! Messages carry only a task id; the task table is the source of truth.
//! Backends: SQS (`aws-sdk-sqs`), Pub/Sub (REST), and an in-memory broker
//! that models visibility timeouts and dead-lettering for tests.

pub mod factory;
pub mod memory;
pub mod pubsub;
pub mod sqs;
pub mod traits;

pub use factory::{create_queue, create_queue_router, QueueRouter};
pub use memory::MemoryQueue;
pub use pubsub::PubSubQueue;
pub use sqs::SqsQueue;
pub use traits::{Delivery, QueueError, QueueResult, TaskQueue};
