//! Fluxio Storage Library
//!
//! Object storage abstraction over the two cloud ecosystems. The
//! [`ObjectStorage`] trait covers exactly what the orchestrator needs:
//! fetch a source object, write a transform result, and answer existence
//! questions about objects and buckets. Backends exist for S3 and GCS
//! (both through the `object_store` crate) plus an in-memory double for
//! tests. The [`StorageRouter`] picks a backend by path scheme.

pub mod factory;
pub mod gcs;
pub mod memory;
pub mod s3;
pub mod traits;

pub use factory::{create_router, create_storage, StorageRouter};
pub use gcs::GcsObjectStorage;
pub use memory::MemoryObjectStorage;
pub use s3::S3ObjectStorage;
pub use traits::{ByteStream, ObjectStorage, StorageError, StorageResult};
