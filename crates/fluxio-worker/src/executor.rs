//! Transform executor
//!
//! The transform itself is an external tool: the worker hands it a local
//! input file and takes back a local output file, nothing more. Timeouts
//! are enforced by the caller, not here; a hung tool is abandoned when the
//! deadline fires and its process is killed on drop.

use async_trait::async_trait;
use fluxio_core::models::TaskAction;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Transform tool failed: {0}")]
    ToolFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque local-file transform.
#[async_trait]
pub trait TransformExecutor: Send + Sync {
    /// Run `action` against a local input file and return the path of the
    /// produced output file.
    async fn run(&self, action: TaskAction, input: &Path) -> Result<PathBuf, ExecutorError>;
}

/// Runs the external tool for each action.
#[derive(Clone)]
pub struct CommandExecutor {
    ffmpeg_path: String,
}

impl CommandExecutor {
    pub fn new(ffmpeg_path: String) -> Self {
        CommandExecutor { ffmpeg_path }
    }

    fn output_path(action: TaskAction, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = match action {
            TaskAction::ConvertH265 => format!("{}_h265.mp4", stem),
            TaskAction::Compress => format!("{}.zip", stem),
            TaskAction::Rename => {
                let ext = input
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_default();
                format!("{}_out{}", stem, ext)
            }
        };
        input.with_file_name(name)
    }

    async fn run_tool(mut command: Command) -> Result<(), ExecutorError> {
        let output = command.kill_on_drop(true).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExecutorError::ToolFailed(format!(
                "exit {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TransformExecutor for CommandExecutor {
    async fn run(&self, action: TaskAction, input: &Path) -> Result<PathBuf, ExecutorError> {
        let output_path = Self::output_path(action, input);

        match action {
            TaskAction::ConvertH265 => {
                let mut command = Command::new(&self.ffmpeg_path);
                command
                    .arg("-y")
                    .arg("-i")
                    .arg(input)
                    .arg("-c:v")
                    .arg("libx265")
                    .arg("-c:a")
                    .arg("copy")
                    .arg(&output_path);
                Self::run_tool(command).await?;
            }
            TaskAction::Compress => {
                let mut command = Command::new("zip");
                command.arg("-j").arg("-q").arg(&output_path).arg(input);
                Self::run_tool(command).await?;
            }
            TaskAction::Rename => {
                // Rename only changes the destination key; the content is
                // carried over untouched.
                tokio::fs::copy(input, &output_path).await?;
            }
        }

        Ok(output_path)
    }
}

/// Programmable executor for tests.
#[derive(Debug, Clone, Copy)]
pub enum MockMode {
    /// Copy the input to an output file and succeed.
    Succeed,
    /// Fail immediately.
    Fail,
    /// Never return; exercises the caller's deadline.
    Hang,
}

#[derive(Default)]
pub struct MockExecutor {
    mode: std::sync::Mutex<Option<MockMode>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockExecutor {
    pub fn succeeding() -> Self {
        let executor = MockExecutor::default();
        executor.set_mode(MockMode::Succeed);
        executor
    }

    pub fn failing() -> Self {
        let executor = MockExecutor::default();
        executor.set_mode(MockMode::Fail);
        executor
    }

    pub fn hanging() -> Self {
        let executor = MockExecutor::default();
        executor.set_mode(MockMode::Hang);
        executor
    }

    pub fn set_mode(&self, mode: MockMode) {
        *self.mode.lock().unwrap() = Some(mode);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformExecutor for MockExecutor {
    async fn run(&self, _action: TaskAction, input: &Path) -> Result<PathBuf, ExecutorError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mode = self.mode.lock().unwrap().unwrap_or(MockMode::Succeed);
        match mode {
            MockMode::Succeed => {
                let output_path = input.with_extension("out");
                tokio::fs::copy(input, &output_path).await?;
                Ok(output_path)
            }
            MockMode::Fail => Err(ExecutorError::ToolFailed("mock failure".to_string())),
            MockMode::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_per_action() {
        let input = Path::new("/work/input_abc.mp4");
        assert_eq!(
            CommandExecutor::output_path(TaskAction::ConvertH265, input),
            Path::new("/work/input_abc_h265.mp4")
        );
        assert_eq!(
            CommandExecutor::output_path(TaskAction::Compress, input),
            Path::new("/work/input_abc.zip")
        );
        assert_eq!(
            CommandExecutor::output_path(TaskAction::Rename, input),
            Path::new("/work/input_abc_out.mp4")
        );
    }

    #[tokio::test]
    async fn test_rename_copies_content() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input_x.bin");
        tokio::fs::write(&input, b"payload").await.unwrap();

        let executor = CommandExecutor::new("ffmpeg".to_string());
        let output = executor.run(TaskAction::Rename, &input).await.unwrap();
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_mock_executor_counts_calls() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        tokio::fs::write(&input, b"data").await.unwrap();

        let executor = MockExecutor::succeeding();
        executor.run(TaskAction::Compress, &input).await.unwrap();
        assert_eq!(executor.calls(), 1);

        executor.set_mode(MockMode::Fail);
        assert!(executor.run(TaskAction::Compress, &input).await.is_err());
        assert_eq!(executor.calls(), 2);
    }
}
