pub mod batch;
pub mod check;
pub mod task;

pub use batch::{BatchOutcome, SessionStatus, TaskRequest, TaskStatusEntry};
pub use check::{MissingReason, PathCheck};
pub use task::{TaskAction, TaskMessage, TaskRecord, TaskStatus, TaskUpdate};
