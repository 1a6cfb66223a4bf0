//! Command execution seam for the package manager CLI
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only pre-approved programs can execute
//! - **Injection prevention**: Uses `tokio::process::Command`, never a shell
//! - **Argument safety**: Arguments are passed as a vector, never interpolated
//! - **Cancellation**: The child is killed when the caller's token fires
//!
//! # Example
//!
//! ```rust,no_run
//! use nuget_publisher::security::{CommandExecutor, SystemCommandExecutor};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), nuget_publisher::security::CommandError> {
//! let executor = SystemCommandExecutor::new();
//! let output = executor
//!     .run("dotnet", &["--version".to_string()], &CancellationToken::new())
//!     .await?;
//! println!("{}", String::from_utf8_lossy(&output));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Allowed commands whitelist for security.
///
/// Only these programs can be executed via [`SystemCommandExecutor`].
const ALLOWED_COMMANDS: &[&str] = &["dotnet"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// The process could not be started or awaited
    #[error("command execution failed: {0}")]
    LaunchFailed(String),

    /// The process ran and reported failure
    #[error("{status}")]
    ExitFailure { status: String, output: Vec<u8> },

    /// The caller cancelled the invocation
    #[error("command cancelled")]
    Cancelled,
}

impl CommandError {
    /// Combined stdout/stderr captured before the failure, if any
    pub fn output(&self) -> &[u8] {
        match self {
            Self::ExitFailure { output, .. } => output,
            _ => &[],
        }
    }
}

/// Runs an external program and captures its combined output
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CommandError>;
}

/// Executor that spawns real processes
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    /// Working directory for spawned processes (inherited when `None`)
    working_dir: Option<PathBuf>,
    allowed: Vec<String>,
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self {
            working_dir: None,
            allowed: ALLOWED_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Run commands from `working_dir`, which must exist.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn with_working_dir<P: AsRef<Path>>(mut self, working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        self.working_dir = Some(working_dir);
        Ok(self)
    }

    /// Extend the whitelist with another program
    pub fn allow_command(mut self, program: &str) -> Self {
        self.allowed.push(program.to_string());
        self
    }

    fn is_allowed(&self, program: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == program)
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CommandError> {
        if !self.is_allowed(program) {
            return Err(CommandError::CommandNotAllowed(program.to_string()));
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| CommandError::LaunchFailed(e.to_string()))?;

        // Dropping the child on cancellation kills it
        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| CommandError::LaunchFailed(e.to_string()))?
            }
            _ = cancel.cancelled() => return Err(CommandError::Cancelled),
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        debug!(program, status = %output.status, bytes = combined.len(), "command finished");

        if !output.status.success() {
            return Err(CommandError::ExitFailure {
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(combined)
    }
}
