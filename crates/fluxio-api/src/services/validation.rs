//! Path validation service
//!
//! Normalizes a path and asks the object store whether it exists. The
//! bucket is checked before the object so a missing bucket and a missing
//! object report differently; access problems are an answer here, not an
//! error, because the client asked precisely that question.

use fluxio_core::models::{MissingReason, PathCheck};
use fluxio_core::path::CloudPath;
use fluxio_core::AppError;
use fluxio_storage::{ObjectStorage, StorageError, StorageRouter};

pub async fn check_path(
    storage: &StorageRouter,
    raw: &str,
    bucket_only: bool,
) -> Result<PathCheck, AppError> {
    if bucket_only {
        // Pre-validation of an output location before any key is known.
        let bucket = CloudPath::parse_bucket(raw)?;
        let backend = storage.for_scheme(bucket.scheme);
        return match backend.bucket_exists(&bucket.bucket).await {
            Ok(true) => Ok(PathCheck::found()),
            Ok(false) => Ok(PathCheck::missing(MissingReason::BucketNotFound)),
            Err(StorageError::AccessDenied(_)) => {
                Ok(PathCheck::missing(MissingReason::AccessDenied))
            }
            Err(other) => Err(AppError::Storage(other.to_string())),
        };
    }

    let path = CloudPath::parse(raw)?;
    let backend = storage.for_scheme(path.scheme);

    match backend.bucket_exists(&path.bucket).await {
        Ok(true) => {}
        Ok(false) => return Ok(PathCheck::missing(MissingReason::BucketNotFound)),
        Err(StorageError::AccessDenied(_)) => {
            return Ok(PathCheck::missing(MissingReason::AccessDenied))
        }
        Err(other) => return Err(AppError::Storage(other.to_string())),
    }

    match backend.exists(&path.bucket, &path.key).await {
        Ok(true) => Ok(PathCheck::found()),
        Ok(false) => Ok(PathCheck::missing(MissingReason::ObjectNotFound)),
        Err(StorageError::AccessDenied(_)) => Ok(PathCheck::missing(MissingReason::AccessDenied)),
        Err(other) => Err(AppError::Storage(other.to_string())),
    }
}
