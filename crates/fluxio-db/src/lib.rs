//! Fluxio DB Library
//!
//! The task table: the single shared mutable resource of the system.
//! Every mutation is a single-item update keyed by `task_id`; records are
//! never deleted by application code, only expired by the store's TTL.
//! Backends: DynamoDB (`aws-sdk-dynamodb`), Firestore (REST), and a
//! TTL-aware in-memory store for tests.

pub mod dynamo;
pub mod factory;
pub mod firestore;
pub mod memory;
pub mod traits;

pub use dynamo::DynamoTaskStore;
pub use factory::{create_store, create_store_router, StoreRouter};
pub use firestore::FirestoreTaskStore;
pub use memory::MemoryTaskStore;
pub use traits::{StoreError, StoreResult, TaskStore};
