//! Cloud provider and URI scheme tags
//!
//! Every capability (object storage, queue, task table) is selected by a
//! provider tag at construction time. Tasks are routed to a provider by the
//! scheme of their source path.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Cloud ecosystem a capability backend belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
}

impl CloudProvider {
    /// The path scheme objects in this ecosystem are addressed by.
    pub fn scheme(&self) -> CloudScheme {
        match self {
            CloudProvider::Aws => CloudScheme::S3,
            CloudProvider::Gcp => CloudScheme::Gs,
        }
    }
}

impl Display for CloudProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Gcp => write!(f, "gcp"),
        }
    }
}

impl FromStr for CloudProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudProvider::Aws),
            "gcp" => Ok(CloudProvider::Gcp),
            _ => Err(anyhow::anyhow!("Invalid cloud provider: {}", s)),
        }
    }
}

/// URI scheme of a cloud object path (`s3://` or `gs://`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CloudScheme {
    S3,
    Gs,
}

impl CloudScheme {
    /// The provider whose queue and task table serve paths of this scheme.
    pub fn provider(&self) -> CloudProvider {
        match self {
            CloudScheme::S3 => CloudProvider::Aws,
            CloudScheme::Gs => CloudProvider::Gcp,
        }
    }
}

impl Display for CloudScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CloudScheme::S3 => write!(f, "s3"),
            CloudScheme::Gs => write!(f, "gs"),
        }
    }
}

impl FromStr for CloudScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(CloudScheme::S3),
            "gs" => Ok(CloudScheme::Gs),
            _ => Err(anyhow::anyhow!("Invalid cloud scheme: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip() {
        assert_eq!("aws".parse::<CloudProvider>().unwrap(), CloudProvider::Aws);
        assert_eq!("GCP".parse::<CloudProvider>().unwrap(), CloudProvider::Gcp);
        assert!("azure".parse::<CloudProvider>().is_err());
    }

    #[test]
    fn test_scheme_maps_to_provider() {
        assert_eq!(CloudScheme::S3.provider(), CloudProvider::Aws);
        assert_eq!(CloudScheme::Gs.provider(), CloudProvider::Gcp);
        assert_eq!(CloudProvider::Aws.scheme(), CloudScheme::S3);
        assert_eq!(CloudProvider::Gcp.scheme(), CloudScheme::Gs);
    }
}
