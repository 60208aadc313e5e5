//! Shared constants

/// Hard cap on processing attempts per task in the reference deployment.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Broker ack deadline in seconds. A claimed message that is neither acked
/// nor nacked within this window is redelivered.
pub const DEFAULT_ACK_DEADLINE_SECS: u32 = 900;

/// Transform executor deadline. Strictly shorter than the ack deadline so
/// the status write-back always fits inside the claim window.
pub const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 840;

/// Task records expire out of the store after a week.
pub const DEFAULT_RECORD_TTL_SECS: i64 = 7 * 24 * 3600;

/// Upper bound on a staged upload body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// How many per-task errors a batch submission response reports back.
pub const MAX_REPORTED_ERRORS: usize = 5;
