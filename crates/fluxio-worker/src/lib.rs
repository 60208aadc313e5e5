//! Fluxio Worker Library
//!
//! Consumes task messages and drives each task through its lifecycle:
//! claim, destination gate, download, transform, upload, terminal status.
//! Every step is a read-modify-write keyed on the task id so redeliveries
//! and racing workers converge instead of corrupting state.

pub mod executor;
pub mod runner;

pub use executor::{CommandExecutor, ExecutorError, MockExecutor, MockMode, TransformExecutor};
pub use runner::{TaskWorker, WorkerOptions};
