//! Cloud path normalizer
//!
//! Parses `s3://bucket/key` and `gs://bucket/key` URIs into structured
//! references. The scheme prefix is matched case-insensitively and the
//! remainder is split into bucket and key on the first `/`. A bucket-only
//! parse mode exists for pre-validating output locations before a key is
//! known; a bucket-only path is never a valid task source or destination.

use crate::cloud::CloudScheme;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use thiserror::Error;

/// Path normalization failures, distinguished so callers can show
/// different end-user text for each.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Unsupported path format: {0}. Must start with s3:// or gs://")]
    InvalidPrefix(String),

    #[error("Path has no bucket segment")]
    MissingBucket,

    #[error("Path has no object key. Must be scheme://bucket/key")]
    MissingKey,
}

/// A fully-qualified cloud object reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudPath {
    pub scheme: CloudScheme,
    pub bucket: String,
    pub key: String,
}

/// A bucket reference without an object key, used for existence-only checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketRef {
    pub scheme: CloudScheme,
    pub bucket: String,
}

fn split_scheme(path: &str) -> Result<(CloudScheme, &str), PathError> {
    let lower = path.get(..5).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("s3://") => Ok((CloudScheme::S3, &path[5..])),
        Some("gs://") => Ok((CloudScheme::Gs, &path[5..])),
        _ => Err(PathError::InvalidPrefix(path.to_string())),
    }
}

impl CloudPath {
    /// Parse a full `scheme://bucket/key` path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let (scheme, rest) = split_scheme(path)?;
        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(PathError::MissingBucket);
        }
        if key.is_empty() {
            return Err(PathError::MissingKey);
        }
        Ok(CloudPath {
            scheme,
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Parse only the bucket portion, ignoring any key. Used to validate an
    /// output location before the final object key exists.
    pub fn parse_bucket(path: &str) -> Result<BucketRef, PathError> {
        let (scheme, rest) = split_scheme(path)?;
        let bucket = rest.split('/').next().unwrap_or("");
        if bucket.is_empty() {
            return Err(PathError::MissingBucket);
        }
        Ok(BucketRef {
            scheme,
            bucket: bucket.to_string(),
        })
    }

    pub fn bucket_ref(&self) -> BucketRef {
        BucketRef {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
        }
    }

    /// File extension of the object key, including the dot, if any.
    pub fn key_extension(&self) -> Option<&str> {
        let name = self.key.rsplit('/').next()?;
        name.rfind('.').map(|i| &name[i..])
    }
}

impl Display for CloudPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

impl FromStr for CloudPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CloudPath::parse(s)
    }
}

impl Display for BucketRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}://{}", self.scheme, self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_path() {
        let path = CloudPath::parse("s3://my-bucket/videos/input.mp4").unwrap();
        assert_eq!(path.scheme, CloudScheme::S3);
        assert_eq!(path.bucket, "my-bucket");
        assert_eq!(path.key, "videos/input.mp4");
    }

    #[test]
    fn test_parse_gs_path() {
        let path = CloudPath::parse("gs://out/path/file.mp4").unwrap();
        assert_eq!(path.scheme, CloudScheme::Gs);
        assert_eq!(path.bucket, "out");
        assert_eq!(path.key, "path/file.mp4");
    }

    #[test]
    fn test_key_splits_on_first_slash_only() {
        let path = CloudPath::parse("s3://b/a/b/c//d").unwrap();
        assert_eq!(path.bucket, "b");
        assert_eq!(path.key, "a/b/c//d");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let path = CloudPath::parse("S3://bucket/key").unwrap();
        assert_eq!(path.scheme, CloudScheme::S3);
        let path = CloudPath::parse("GS://bucket/key").unwrap();
        assert_eq!(path.scheme, CloudScheme::Gs);
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        assert!(matches!(
            CloudPath::parse("http://bucket/key"),
            Err(PathError::InvalidPrefix(_))
        ));
        assert!(matches!(
            CloudPath::parse("bucket/key"),
            Err(PathError::InvalidPrefix(_))
        ));
        assert!(matches!(
            CloudPath::parse(""),
            Err(PathError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_bucket_only_path_is_missing_key() {
        assert_eq!(CloudPath::parse("s3://b"), Err(PathError::MissingKey));
        assert_eq!(CloudPath::parse("s3://b/"), Err(PathError::MissingKey));
    }

    #[test]
    fn test_empty_bucket_rejected() {
        assert_eq!(CloudPath::parse("s3://"), Err(PathError::MissingBucket));
        assert_eq!(
            CloudPath::parse("s3:///key"),
            Err(PathError::MissingBucket)
        );
    }

    #[test]
    fn test_parse_bucket_ignores_key() {
        let bucket = CloudPath::parse_bucket("gs://out/path/file.mp4").unwrap();
        assert_eq!(bucket.scheme, CloudScheme::Gs);
        assert_eq!(bucket.bucket, "out");

        // A bucket-only URI is fine in this mode.
        let bucket = CloudPath::parse_bucket("s3://b").unwrap();
        assert_eq!(bucket.bucket, "b");
    }

    #[test]
    fn test_key_extension() {
        let path = CloudPath::parse("s3://b/videos/input.mp4").unwrap();
        assert_eq!(path.key_extension(), Some(".mp4"));
        let path = CloudPath::parse("s3://b/videos/raw").unwrap();
        assert_eq!(path.key_extension(), None);
    }

    #[test]
    fn test_display_round_trip() {
        let raw = "s3://my-bucket/videos/input.mp4";
        let path = CloudPath::parse(raw).unwrap();
        assert_eq!(path.to_string(), raw);
    }
}
