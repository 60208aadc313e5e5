//! Configuration module
//!
//! Environment-driven configuration for the API server and the worker.
//! Each cloud ecosystem (AWS, GCP) gets its own endpoint block; a provider
//! counts as configured once its queue and task table are both named. The
//! executor timeout is validated against the broker ack deadline at load so
//! a claimed message can never be redelivered while its status write-back
//! is still in flight.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cloud::CloudProvider;
use crate::constants::{
    DEFAULT_ACK_DEADLINE_SECS, DEFAULT_EXECUTOR_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_RECORD_TTL_SECS,
};

/// Per-provider wiring: queue, task table, and temp upload area.
#[derive(Clone, Debug, Default)]
pub struct CloudEndpoints {
    /// SQS queue URL (AWS) or Pub/Sub topic name (GCP).
    pub queue: Option<String>,
    /// Pub/Sub subscription for the pull side; unused on AWS.
    pub subscription: Option<String>,
    /// DynamoDB table name (AWS) or Firestore collection (GCP).
    pub table: Option<String>,
    /// Bucket holding staged uploads, expired by bucket policy.
    pub temp_bucket: Option<String>,
}

impl CloudEndpoints {
    /// A provider is usable once tasks can be both stored and dispatched.
    pub fn is_configured(&self) -> bool {
        self.queue.is_some() && self.table.is_some()
    }
}

/// Application configuration shared by the API server and the worker.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub aws_region: Option<String>,
    pub gcp_project: Option<String>,
    pub aws: CloudEndpoints,
    pub gcp: CloudEndpoints,
    /// Which ecosystem this worker process consumes from.
    pub worker_cloud: CloudProvider,
    /// Scratch directory for downloaded inputs and transform outputs.
    pub work_dir: PathBuf,
    pub ffmpeg_path: String,
    pub max_attempts: u32,
    /// Broker ack deadline; a claim older than this is redelivered.
    pub ack_deadline_secs: u32,
    pub executor_timeout_secs: u64,
    pub record_ttl_secs: i64,
    pub max_upload_bytes: usize,
    /// Idle sleep between empty receives, for backends without long polling.
    pub queue_poll_interval_ms: u64,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = Config {
            server_port: env_parse("SERVER_PORT", 8080)?,
            environment: env_opt("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            aws_region: env_opt("AWS_REGION"),
            gcp_project: env_opt("GCP_PROJECT"),
            aws: CloudEndpoints {
                queue: env_opt("SQS_QUEUE_URL"),
                subscription: None,
                table: env_opt("DYNAMODB_TABLE"),
                temp_bucket: env_opt("AWS_TEMP_BUCKET"),
            },
            gcp: CloudEndpoints {
                queue: env_opt("PUBSUB_TOPIC"),
                subscription: env_opt("PUBSUB_SUBSCRIPTION"),
                table: env_opt("FIRESTORE_COLLECTION"),
                temp_bucket: env_opt("GCP_TEMP_BUCKET"),
            },
            worker_cloud: env_opt("WORKER_CLOUD")
                .map(|raw| raw.parse())
                .transpose()?
                .unwrap_or(CloudProvider::Aws),
            work_dir: env_opt("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            ffmpeg_path: env_opt("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            max_attempts: env_parse("MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            ack_deadline_secs: env_parse("ACK_DEADLINE_SECS", DEFAULT_ACK_DEADLINE_SECS)?,
            executor_timeout_secs: env_parse(
                "EXECUTOR_TIMEOUT_SECS",
                DEFAULT_EXECUTOR_TIMEOUT_SECS,
            )?,
            record_ttl_secs: env_parse("RECORD_TTL_SECS", DEFAULT_RECORD_TTL_SECS)?,
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            queue_poll_interval_ms: env_parse("QUEUE_POLL_INTERVAL_MS", 1000)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.executor_timeout_secs >= self.ack_deadline_secs as u64 {
            anyhow::bail!(
                "EXECUTOR_TIMEOUT_SECS ({}) must be strictly shorter than ACK_DEADLINE_SECS ({}) \
                 to leave room for the status write-back",
                self.executor_timeout_secs,
                self.ack_deadline_secs
            );
        }
        if !self.aws.is_configured() && !self.gcp.is_configured() {
            anyhow::bail!(
                "No cloud configured: set SQS_QUEUE_URL + DYNAMODB_TABLE and/or \
                 PUBSUB_TOPIC + FIRESTORE_COLLECTION"
            );
        }
        if self.aws.is_configured() && self.aws_region.is_none() {
            anyhow::bail!("AWS_REGION is required when AWS endpoints are configured");
        }
        if self.gcp.is_configured() {
            if self.gcp_project.is_none() {
                anyhow::bail!("GCP_PROJECT is required when GCP endpoints are configured");
            }
            if self.gcp.subscription.is_none() {
                anyhow::bail!("PUBSUB_SUBSCRIPTION is required when PUBSUB_TOPIC is set");
            }
        }
        if self.max_attempts == 0 {
            anyhow::bail!("MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn endpoints(&self, provider: CloudProvider) -> &CloudEndpoints {
        match provider {
            CloudProvider::Aws => &self.aws,
            CloudProvider::Gcp => &self.gcp,
        }
    }

    pub fn is_configured(&self, provider: CloudProvider) -> bool {
        self.endpoints(provider).is_configured()
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn executor_timeout(&self) -> Duration {
        Duration::from_secs(self.executor_timeout_secs)
    }
}
