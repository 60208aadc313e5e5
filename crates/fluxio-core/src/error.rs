//! Error types module
//!
//! This module provides the core error taxonomy used throughout Fluxio.
//! Validation failures are decided synchronously at the API boundary and
//! never enqueued; not-found and access-denied failures are surfaced as
//! distinct variants so clients see distinct text; transient backend
//! failures are the only ones deferred to the worker retry loop.

use crate::cloud::CloudProvider;
use crate::path::PathError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_PATH")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Invalid task action: {0}")]
    UnknownAction(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{0} services not configured")]
    CloudNotConfigured(CloudProvider),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Task table error: {0}")]
    Table(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata per variant: (http_status, error_code, recoverable, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays
/// per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::InvalidPath(_) => (400, "INVALID_PATH", false, LogLevel::Debug),
        AppError::UnknownAction(_) => (400, "UNKNOWN_ACTION", false, LogLevel::Debug),
        AppError::MissingField(_) => (400, "MISSING_FIELD", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::AccessDenied(_) => (403, "ACCESS_DENIED", false, LogLevel::Warn),
        AppError::CloudNotConfigured(_) => (503, "CLOUD_NOT_CONFIGURED", false, LogLevel::Warn),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, LogLevel::Error),
        AppError::Queue(_) => (500, "QUEUE_ERROR", true, LogLevel::Error),
        AppError::Table(_) => (500, "TABLE_ERROR", true, LogLevel::Error),
        AppError::PayloadTooLarge(_) => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            // Backend detail is internal; clients get a stable summary.
            AppError::Storage(_) => "Failed to access object storage".to_string(),
            AppError::Queue(_) => "Failed to access task queue".to_string(),
            AppError::Table(_) => "Failed to access task table".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_invalid_path() {
        let err = AppError::InvalidPath(PathError::MissingKey);
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_PATH");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert!(err.client_message().contains("no object key"));
    }

    #[test]
    fn test_error_metadata_unknown_action() {
        let err = AppError::UnknownAction("transmogrify".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "UNKNOWN_ACTION");
        assert!(err.client_message().contains("transmogrify"));
    }

    #[test]
    fn test_error_metadata_hides_backend_detail() {
        let err = AppError::Table("dynamodb: connection reset".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(!err.client_message().contains("dynamodb"));
    }

    #[test]
    fn test_error_metadata_access_denied_is_distinct() {
        let not_found = AppError::NotFound("s3://b/k".to_string());
        let denied = AppError::AccessDenied("s3://b/k".to_string());
        assert_ne!(not_found.error_code(), denied.error_code());
        assert_ne!(not_found.http_status_code(), denied.http_status_code());
    }
}
