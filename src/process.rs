use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or None when the process was killed by a signal.
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs shell commands. A non-zero exit is a normal result, not an error.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<CommandOutput, ProcessError>;
}

/// Executes commands through `sh -c`, optionally from a fixed directory.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    cwd: Option<PathBuf>,
}

impl ShellExecutor {
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<CommandOutput, ProcessError> {
        info!("Running: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await.map_err(|source| ProcessError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        };
        debug!(status = ?result.status, stdout_bytes = result.stdout.len(), "command finished");
        Ok(result)
    }
}
