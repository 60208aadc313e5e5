//! Task execution error types
//!
//! Errors raised while processing a claimed task carry a recoverability
//! flag and a coarse failure kind. The worker retry loop consults the flag:
//! recoverable errors requeue the task (bounded by the attempt cap),
//! unrecoverable errors fail it permanently on the spot. The kind becomes
//! part of the recorded `error_message` so terminal failures are
//! distinguishable without string sniffing.

use std::fmt;

/// Coarse classification of a processing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Source or destination object/bucket absent.
    NotFound,
    /// Credentials or permissions; retrying cannot change the outcome.
    PermissionDenied,
    /// Transform executor exceeded its deadline.
    Timeout,
    /// Fetching the source object failed.
    DownloadFailed,
    /// Writing the result to the destination failed.
    UploadFailed,
    /// The transform executor itself failed.
    ProcessingFailed,
    /// Record carries an action this worker does not recognize.
    UnknownAction,
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::NotFound => "not_found",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::Timeout => "timeout",
            FailureKind::DownloadFailed => "download_failed",
            FailureKind::UploadFailed => "upload_failed",
            FailureKind::ProcessingFailed => "processing_failed",
            FailureKind::UnknownAction => "unknown_action",
            FailureKind::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Task execution error that can be either recoverable or unrecoverable.
#[derive(Debug)]
pub struct TaskError {
    inner: anyhow::Error,
    kind: FailureKind,
    recoverable: bool,
}

impl TaskError {
    /// Create a new unrecoverable task error.
    ///
    /// Unrecoverable errors fail the task immediately without retrying:
    /// missing source objects, permission errors, unknown actions.
    pub fn unrecoverable(kind: FailureKind, err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            kind,
            recoverable: false,
        }
    }

    /// Create a new recoverable task error.
    ///
    /// Recoverable errors are retried via broker redelivery up to the
    /// attempt cap: transient network failures, executor timeouts.
    pub fn recoverable(kind: FailureKind, err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            kind,
            recoverable: true,
        }
    }

    /// Check if this error is recoverable (should be retried)
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The human-readable reason recorded on the task record.
    pub fn record_message(&self) -> String {
        format!("{}: {}", self.kind, self.inner)
    }

    /// Get the inner error
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for TaskError {
    /// Default conversion from anyhow::Error creates a recoverable error
    fn from(err: anyhow::Error) -> Self {
        Self::recoverable(FailureKind::Unknown, err)
    }
}

/// Extension trait for Result to easily create unrecoverable task errors
pub trait TaskResultExt<T> {
    /// Mark this result as unrecoverable on error
    fn unrecoverable(self, kind: FailureKind) -> Result<T, TaskError>;

    /// Mark this result as recoverable on error
    fn recoverable(self, kind: FailureKind) -> Result<T, TaskError>;
}

impl<T, E: Into<anyhow::Error>> TaskResultExt<T> for Result<T, E> {
    fn unrecoverable(self, kind: FailureKind) -> Result<T, TaskError> {
        self.map_err(|e| TaskError::unrecoverable(kind, e.into()))
    }

    fn recoverable(self, kind: FailureKind) -> Result<T, TaskError> {
        self.map_err(|e| TaskError::recoverable(kind, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecoverable_error() {
        let err = TaskError::unrecoverable(
            FailureKind::PermissionDenied,
            anyhow::anyhow!("access denied on s3://b/k"),
        );
        assert!(!err.is_recoverable());
        assert_eq!(err.kind(), FailureKind::PermissionDenied);
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_recoverable_error() {
        let err = TaskError::recoverable(FailureKind::Timeout, anyhow::anyhow!("deadline"));
        assert!(err.is_recoverable());
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_from_anyhow_defaults_to_recoverable() {
        let err: TaskError = anyhow::anyhow!("some error").into();
        assert!(err.is_recoverable());
        assert_eq!(err.kind(), FailureKind::Unknown);
    }

    #[test]
    fn test_record_message_carries_kind() {
        let err = TaskError::unrecoverable(
            FailureKind::DownloadFailed,
            anyhow::anyhow!("source object not found"),
        );
        assert_eq!(
            err.record_message(),
            "download_failed: source object not found"
        );
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("bad action"));
        let task_result = result.unrecoverable(FailureKind::UnknownAction);
        assert!(!task_result.unwrap_err().is_recoverable());
    }
}
