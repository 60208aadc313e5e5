//! In-memory object storage for tests
//!
//! Buckets are explicit: an object can only be written into a bucket that
//! was created first, and existence checks distinguish a missing bucket
//! from a missing object the way the cloud backends do. Buckets can be
//! marked denied to exercise the access-denied paths.

use crate::traits::{ByteStream, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;

#[derive(Default)]
struct Inner {
    buckets: HashMap<String, HashMap<String, Bytes>>,
    denied: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor creating the named buckets up front.
    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let storage = Self::new();
        for bucket in buckets {
            storage.create_bucket(bucket);
        }
        storage
    }

    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.into())
            .or_default();
    }

    pub fn remove_bucket(&self, bucket: &str) {
        self.inner.lock().unwrap().buckets.remove(bucket);
    }

    /// Make every operation against this bucket fail with access denied.
    pub fn deny_bucket(&self, bucket: impl Into<String>) {
        self.inner.lock().unwrap().denied.insert(bucket.into());
    }

    /// Snapshot of an object's content, for assertions.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    fn check_denied(inner: &Inner, bucket: &str) -> StorageResult<()> {
        if inner.denied.contains(bucket) {
            return Err(StorageError::AccessDenied(bucket.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let inner = self.inner.lock().unwrap();
        Self::check_denied(&inner, bucket)?;
        inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn get_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        let bytes = self.get(bucket, key).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(bytes) })))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_denied(&inner, bucket)?;
        let objects = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::NotFound(bucket.to_string()))?;
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let mut buffer = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        let size = buffer.len() as u64;
        self.put(bucket, key, Bytes::from(buffer)).await?;
        Ok(size)
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let inner = self.inner.lock().unwrap();
        Self::check_denied(&inner, bucket)?;
        Ok(inner
            .buckets
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let inner = self.inner.lock().unwrap();
        Self::check_denied(&inner, bucket)?;
        Ok(inner.buckets.contains_key(bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let storage = MemoryObjectStorage::with_buckets(["in"]);
        storage
            .put("in", "videos/a.mp4", Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert_eq!(
            storage.get("in", "videos/a.mp4").await.unwrap(),
            Bytes::from_static(b"data")
        );
        assert!(storage.exists("in", "videos/a.mp4").await.unwrap());
        assert!(!storage.exists("in", "videos/b.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let storage = MemoryObjectStorage::with_buckets(["in"]);
        assert!(matches!(
            storage.get("in", "absent").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_into_missing_bucket_fails() {
        let storage = MemoryObjectStorage::new();
        assert!(matches!(
            storage.put("absent", "k", Bytes::new()).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bucket_existence_independent_of_keys() {
        let storage = MemoryObjectStorage::with_buckets(["out"]);
        assert!(storage.bucket_exists("out").await.unwrap());
        assert!(!storage.exists("out", "path/file.mp4").await.unwrap());
        assert!(!storage.bucket_exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn test_denied_bucket_errors() {
        let storage = MemoryObjectStorage::with_buckets(["locked"]);
        storage.deny_bucket("locked");
        assert!(matches!(
            storage.exists("locked", "k").await,
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(
            storage.bucket_exists("locked").await,
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_get_stream_yields_content() {
        let storage = MemoryObjectStorage::with_buckets(["in"]);
        storage
            .put("in", "k", Bytes::from_static(b"chunked"))
            .await
            .unwrap();
        let mut stream = storage.get_stream("in", "k").await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"chunked"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_put_stream_reads_to_eof() {
        let storage = MemoryObjectStorage::with_buckets(["out"]);
        let reader = Box::pin(std::io::Cursor::new(b"streamed".to_vec()));
        let written = storage.put_stream("out", "k", reader).await.unwrap();
        assert_eq!(written, 8);
        assert_eq!(
            storage.object("out", "k").unwrap(),
            Bytes::from_static(b"streamed")
        );
    }
}
