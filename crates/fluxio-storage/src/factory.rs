use crate::{GcsObjectStorage, ObjectStorage, S3ObjectStorage};
use fluxio_core::{CloudProvider, CloudScheme, Config};
use std::sync::Arc;

/// Create the storage backend for one provider.
pub fn create_storage(provider: CloudProvider, config: &Config) -> Arc<dyn ObjectStorage> {
    match provider {
        CloudProvider::Aws => Arc::new(S3ObjectStorage::new(config.aws_region.clone())),
        CloudProvider::Gcp => Arc::new(GcsObjectStorage::new()),
    }
}

/// Routes object operations to a backend by path scheme.
///
/// Both backends are always present: clients are built lazily per bucket,
/// so carrying an unused side costs nothing, and a task may legitimately
/// read from one cloud and write to the other.
#[derive(Clone)]
pub struct StorageRouter {
    aws: Arc<dyn ObjectStorage>,
    gcp: Arc<dyn ObjectStorage>,
}

impl StorageRouter {
    pub fn new(aws: Arc<dyn ObjectStorage>, gcp: Arc<dyn ObjectStorage>) -> Self {
        StorageRouter { aws, gcp }
    }

    pub fn for_scheme(&self, scheme: CloudScheme) -> &Arc<dyn ObjectStorage> {
        self.for_provider(scheme.provider())
    }

    pub fn for_provider(&self, provider: CloudProvider) -> &Arc<dyn ObjectStorage> {
        match provider {
            CloudProvider::Aws => &self.aws,
            CloudProvider::Gcp => &self.gcp,
        }
    }
}

/// Build the router from configuration.
pub fn create_router(config: &Config) -> StorageRouter {
    StorageRouter::new(
        create_storage(CloudProvider::Aws, config),
        create_storage(CloudProvider::Gcp, config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryObjectStorage;

    #[tokio::test]
    async fn test_router_picks_backend_by_scheme() {
        let aws = MemoryObjectStorage::with_buckets(["aws-bucket"]);
        let gcp = MemoryObjectStorage::with_buckets(["gcp-bucket"]);
        let router = StorageRouter::new(Arc::new(aws), Arc::new(gcp));

        assert!(router
            .for_scheme(CloudScheme::S3)
            .bucket_exists("aws-bucket")
            .await
            .unwrap());
        assert!(!router
            .for_scheme(CloudScheme::Gs)
            .bucket_exists("aws-bucket")
            .await
            .unwrap());
        assert!(router
            .for_scheme(CloudScheme::Gs)
            .bucket_exists("gcp-bucket")
            .await
            .unwrap());
    }
}
