use crate::traits::{ByteStream, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;

/// GCS object storage implementation
///
/// Same shape as the S3 backend: per-bucket clients built lazily from
/// environment credentials (`GoogleCloudStorageBuilder::from_env`) and
/// cached for reuse.
#[derive(Clone, Default)]
pub struct GcsObjectStorage {
    stores: Arc<Mutex<HashMap<String, Arc<GoogleCloudStorage>>>>,
}

impl GcsObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn store_for(&self, bucket: &str) -> StorageResult<Arc<GoogleCloudStorage>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::BackendError("store cache poisoned".to_string()))?;
        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let store = Arc::new(
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket.to_string())
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );
        stores.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    fn target(bucket: &str, key: &str) -> String {
        format!("gs://{}/{}", bucket, key)
    }
}

#[async_trait]
impl ObjectStorage for GcsObjectStorage {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.get(&location).await;
        let result = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS download failed"
            );
            StorageError::from_backend(e, &Self::target(bucket, key))
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS download successful"
        );

        Ok(bytes)
    }

    async fn get_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = store.get(&location).await;
        let result =
            result.map_err(|e| StorageError::from_backend(e, &Self::target(bucket, key)))?;

        let target = Self::target(bucket, key);
        let stream = result.into_stream().map(move |res| {
            res.map_err(|e| {
                tracing::error!(target = %target, error = %e, "GCS stream download error");
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.put(&location, PutPayload::from(data)).await;
        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS upload failed"
            );
            match StorageError::from_backend(e, &Self::target(bucket, key)) {
                StorageError::BackendError(msg) => StorageError::UploadFailed(msg),
                other => other,
            }
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(())
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let mut buffer = Vec::new();
        let mut temp_buf = vec![0u8; 8192];

        loop {
            let bytes_read = tokio::io::AsyncReadExt::read(&mut reader, &mut temp_buf)
                .await
                .map_err(|e| {
                    StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
                })?;
            if bytes_read == 0 {
                break;
            }
            buffer.extend_from_slice(&temp_buf[..bytes_read]);
        }

        let size = buffer.len() as u64;
        self.put(bucket, key, Bytes::from(buffer)).await?;
        Ok(size)
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());
        match store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from_backend(e, &Self::target(bucket, key))),
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let store = self.store_for(bucket)?;
        match store.list_with_delimiter(None).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from_backend(e, bucket)),
        }
    }
}
