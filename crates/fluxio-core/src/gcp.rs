//! GCP bearer-token source
//!
//! The Pub/Sub and Firestore backends speak REST and need an OAuth access
//! token per request. Locally the token comes from `GCP_ACCESS_TOKEN`; on
//! GCE/GKE it is fetched from the instance metadata server and cached
//! until shortly before expiry. Service-account key exchange is a
//! deployment concern and is not handled here.

use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Access-token source for Google REST APIs.
#[derive(Clone)]
pub struct GcpAuth {
    http: reqwest::Client,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl Default for GcpAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl GcpAuth {
    pub fn new() -> Self {
        GcpAuth {
            http: reqwest::Client::new(),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Current bearer token: the `GCP_ACCESS_TOKEN` env var when set,
    /// otherwise a cached token from the metadata server.
    pub async fn token(&self) -> Result<String, anyhow::Error> {
        if let Ok(token) = std::env::var("GCP_ACCESS_TOKEN") {
            if !token.is_empty() {
                return Ok(token);
            }
        }

        let mut cached = self.cached.lock().await;
        if let Some(ref entry) = *cached {
            if entry.expires_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Metadata server unreachable: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Metadata token request failed: {}", e))?;

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Invalid metadata token response: {}", e))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        tracing::debug!(expires_in = token.expires_in, "Fetched GCP access token");
        Ok(token.access_token)
    }
}
