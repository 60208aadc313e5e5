//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends
//! must implement, and the error taxonomy shared by them. Not-found and
//! access-denied are separate variants: callers surface different text for
//! each and the worker treats access-denied as permanent.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Map an `object_store` error onto the taxonomy, keeping not-found
    /// and permission failures distinct from generic backend errors.
    pub(crate) fn from_backend(err: object_store::Error, target: &str) -> Self {
        use object_store::Error as E;
        match err {
            E::NotFound { .. } => StorageError::NotFound(target.to_string()),
            E::PermissionDenied { .. } | E::Unauthenticated { .. } => {
                StorageError::AccessDenied(target.to_string())
            }
            other => StorageError::BackendError(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A chunked download body.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Object storage abstraction
///
/// Both cloud backends and the in-memory test double implement this trait.
/// Buckets are addressed explicitly per call because a single deployment
/// reads sources from and writes results to arbitrary buckets named in
/// task paths.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Download an object fully into memory.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// Download an object as a stream of chunks, for large files.
    async fn get_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteStream>;

    /// Write an object. Overwrites silently: result writes must be safe to
    /// repeat under redelivery.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()>;

    /// Write an object from a reader, consumed until EOF. Returns the
    /// number of bytes written.
    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64>;

    /// Whether an object exists. Access problems surface as errors, not
    /// as `false`.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Whether a bucket exists, independent of any key.
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;
}
