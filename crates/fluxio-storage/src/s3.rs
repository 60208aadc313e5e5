use crate::traits::{ByteStream, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;

/// S3 object storage implementation
///
/// `object_store` clients are scoped to a single bucket, while task paths
/// name arbitrary buckets, so clients are built lazily per bucket and
/// cached. Credentials come from the environment (`AmazonS3Builder::from_env`).
#[derive(Clone)]
pub struct S3ObjectStorage {
    region: Option<String>,
    stores: Arc<Mutex<HashMap<String, Arc<AmazonS3>>>>,
}

impl S3ObjectStorage {
    pub fn new(region: Option<String>) -> Self {
        S3ObjectStorage {
            region,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn store_for(&self, bucket: &str) -> StorageResult<Arc<AmazonS3>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::BackendError("store cache poisoned".to_string()))?;
        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket.to_string());
        if let Some(ref region) = self.region {
            builder = builder.with_region(region.clone());
        }
        let store = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );
        stores.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    fn target(bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
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
                "S3 download failed"
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
            "S3 download successful"
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
                tracing::error!(target = %target, error = %e, "S3 stream download error");
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
                "S3 upload failed"
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
            "S3 upload successful"
        );

        Ok(())
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        // Read the entire stream into memory and upload in a single put.
        // Less optimal for very large files but keeps the backend simple
        // while still going through object_store's S3 integration.
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
        // A bounded list against the bucket root answers existence without
        // needing any key to be present.
        match store.list_with_delimiter(None).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from_backend(e, bucket)),
        }
    }
}
