use crate::{PubSubQueue, QueueError, QueueResult, SqsQueue, TaskQueue};
use fluxio_core::{CloudProvider, Config};
use std::sync::Arc;

/// Create the queue backend for one provider from configuration.
pub async fn create_queue(
    provider: CloudProvider,
    config: &Config,
) -> QueueResult<Arc<dyn TaskQueue>> {
    match provider {
        CloudProvider::Aws => {
            let queue_url = config
                .aws
                .queue
                .clone()
                .ok_or_else(|| QueueError::ConfigError("SQS_QUEUE_URL not configured".to_string()))?;
            Ok(Arc::new(
                SqsQueue::new(queue_url, config.aws_region.clone(), config.ack_deadline_secs)
                    .await,
            ))
        }
        CloudProvider::Gcp => {
            let project = config.gcp_project.clone().ok_or_else(|| {
                QueueError::ConfigError("GCP_PROJECT not configured".to_string())
            })?;
            let topic = config.gcp.queue.clone().ok_or_else(|| {
                QueueError::ConfigError("PUBSUB_TOPIC not configured".to_string())
            })?;
            let subscription = config.gcp.subscription.clone().ok_or_else(|| {
                QueueError::ConfigError("PUBSUB_SUBSCRIPTION not configured".to_string())
            })?;
            Ok(Arc::new(PubSubQueue::new(
                project,
                topic,
                subscription,
                config.ack_deadline_secs,
            )))
        }
    }
}

/// Routes enqueues to a provider's broker. Only configured providers are
/// present; submitting a task toward an absent provider is a per-task
/// error, not a crash.
#[derive(Clone, Default)]
pub struct QueueRouter {
    aws: Option<Arc<dyn TaskQueue>>,
    gcp: Option<Arc<dyn TaskQueue>>,
}

impl QueueRouter {
    pub fn new(aws: Option<Arc<dyn TaskQueue>>, gcp: Option<Arc<dyn TaskQueue>>) -> Self {
        QueueRouter { aws, gcp }
    }

    pub fn for_provider(&self, provider: CloudProvider) -> QueueResult<&Arc<dyn TaskQueue>> {
        let queue = match provider {
            CloudProvider::Aws => self.aws.as_ref(),
            CloudProvider::Gcp => self.gcp.as_ref(),
        };
        queue.ok_or_else(|| QueueError::ConfigError(format!("{} queue not configured", provider)))
    }

    pub fn is_configured(&self, provider: CloudProvider) -> bool {
        match provider {
            CloudProvider::Aws => self.aws.is_some(),
            CloudProvider::Gcp => self.gcp.is_some(),
        }
    }
}

/// Build the router with a backend per configured provider.
pub async fn create_queue_router(config: &Config) -> QueueResult<QueueRouter> {
    let aws = if config.is_configured(CloudProvider::Aws) {
        Some(create_queue(CloudProvider::Aws, config).await?)
    } else {
        None
    };
    let gcp = if config.is_configured(CloudProvider::Gcp) {
        Some(create_queue(CloudProvider::Gcp, config).await?)
    } else {
        None
    };
    Ok(QueueRouter::new(aws, gcp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryQueue;
    use std::time::Duration;

    #[test]
    fn test_unconfigured_provider_is_an_error() {
        let queue: Arc<dyn TaskQueue> = Arc::new(MemoryQueue::new(Duration::from_secs(30), 5));
        let router = QueueRouter::new(Some(queue), None);
        assert!(router.for_provider(CloudProvider::Aws).is_ok());
        assert!(matches!(
            router.for_provider(CloudProvider::Gcp),
            Err(QueueError::ConfigError(_))
        ));
    }
}
