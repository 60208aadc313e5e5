use crate::{DynamoTaskStore, FirestoreTaskStore, StoreError, StoreResult, TaskStore};
use fluxio_core::{CloudProvider, Config};
use std::sync::Arc;

/// Create the task table backend for one provider from configuration.
pub async fn create_store(
    provider: CloudProvider,
    config: &Config,
) -> StoreResult<Arc<dyn TaskStore>> {
    match provider {
        CloudProvider::Aws => {
            let table = config.aws.table.clone().ok_or_else(|| {
                StoreError::ConfigError("DYNAMODB_TABLE not configured".to_string())
            })?;
            Ok(Arc::new(
                DynamoTaskStore::new(table, config.aws_region.clone()).await,
            ))
        }
        CloudProvider::Gcp => {
            let project = config.gcp_project.clone().ok_or_else(|| {
                StoreError::ConfigError("GCP_PROJECT not configured".to_string())
            })?;
            let collection = config.gcp.table.clone().ok_or_else(|| {
                StoreError::ConfigError("FIRESTORE_COLLECTION not configured".to_string())
            })?;
            Ok(Arc::new(FirestoreTaskStore::new(project, collection)))
        }
    }
}

/// Routes record operations to a provider's task table. A session may span
/// both clouds, so status aggregation iterates every configured store.
#[derive(Clone, Default)]
pub struct StoreRouter {
    aws: Option<Arc<dyn TaskStore>>,
    gcp: Option<Arc<dyn TaskStore>>,
}

impl StoreRouter {
    pub fn new(aws: Option<Arc<dyn TaskStore>>, gcp: Option<Arc<dyn TaskStore>>) -> Self {
        StoreRouter { aws, gcp }
    }

    pub fn for_provider(&self, provider: CloudProvider) -> StoreResult<&Arc<dyn TaskStore>> {
        let store = match provider {
            CloudProvider::Aws => self.aws.as_ref(),
            CloudProvider::Gcp => self.gcp.as_ref(),
        };
        store.ok_or_else(|| {
            StoreError::ConfigError(format!("{} task table not configured", provider))
        })
    }

    /// Every configured store, for queries that span providers.
    pub fn configured(&self) -> Vec<&Arc<dyn TaskStore>> {
        [self.aws.as_ref(), self.gcp.as_ref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Build the router with a backend per configured provider.
pub async fn create_store_router(config: &Config) -> StoreResult<StoreRouter> {
    let aws = if config.is_configured(CloudProvider::Aws) {
        Some(create_store(CloudProvider::Aws, config).await?)
    } else {
        None
    };
    let gcp = if config.is_configured(CloudProvider::Gcp) {
        Some(create_store(CloudProvider::Gcp, config).await?)
    } else {
        None
    };
    Ok(StoreRouter::new(aws, gcp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTaskStore;

    #[test]
    fn test_unconfigured_provider_is_an_error() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
        let router = StoreRouter::new(Some(store), None);
        assert!(router.for_provider(CloudProvider::Aws).is_ok());
        assert!(matches!(
            router.for_provider(CloudProvider::Gcp),
            Err(StoreError::ConfigError(_))
        ));
        assert_eq!(router.configured().len(), 1);
    }
}
