//! # Command Execution Abstraction Layer
//!
//! Every interaction with the container runtime is a child process. This
//! module is the single seam through which those processes are spawned, so
//! the rest of the crate can be exercised against a recording executor in
//! tests.
//!
//! ## Core Components
//!
//! - **[`CommandExecutor`]**: trait implemented by anything that can run an
//!   [`ExecutionCommand`] in one of three modes
//! - **[`HostExecutor`]**: spawns real processes via `tokio::process::Command`
//! - **[`RecordingExecutor`]**: records commands and answers with canned results
//! - **[`ExecutionResult`]**: captured stdout, stderr, exit code and duration
//!
//! ## Execution Modes
//!
//! ```text
//! ExecutionCommand
//!        ↓
//!   ┌────┼──────────────┐
//!   │    │              │
//! execute  execute_streaming  execute_interactive
//!   │    │              │
//! capture  tee to sinks   inherit stdio
//!   │    │              │
//!   └────┴──────┬───────┘
//!               ↓
//!   ExecutionResult / exit code
//! ```
//!
//! No mode applies a timeout: the runtime operation is awaited until it
//! finishes on its own.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Host-based command execution.
///
/// Implements [`HostExecutor`] for direct process execution on the
/// host system using `tokio::process::Command`.
pub mod host;
pub mod recording;

pub use host::HostExecutor;
pub use recording::RecordingExecutor;

/// Destination for streamed child output.
pub type OutputSink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Result of command execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Standard output from the command (empty when streamed)
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Exit code (0 = success, non-zero = failure, -1 = killed by signal)
    pub exit_code: i32,
    /// Duration of command execution
    pub duration: Duration,
}

impl ExecutionResult {
    /// Check if the command executed successfully (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionCommand {
    /// Program name or path to execute
    pub program: String,
    /// Command line arguments
    pub args: Vec<String>,
}

impl ExecutionCommand {
    /// Create a new command with just program and args
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// First argument, which for runtime invocations is the subcommand
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for ExecutionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", shell_escape::escape(arg.as_str().into()))?;
        }
        Ok(())
    }
}

/// Errors during command execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The program could not be found
    #[error("Program unavailable: {0}")]
    Unavailable(String),

    /// I/O error while spawning or talking to the child
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Runs commands on behalf of the runtime client.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion, capturing stdout and stderr.
    async fn execute(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError>;

    /// Run to completion, forwarding stdout/stderr to the sinks as they are
    /// produced. Stderr is also captured in the result.
    async fn execute_streaming(
        &self,
        cmd: ExecutionCommand,
        stdout: OutputSink<'_>,
        stderr: OutputSink<'_>,
    ) -> Result<ExecutionResult, ExecutorError>;

    /// Run with the caller's stdin/stdout/stderr attached and return the
    /// child's exit code.
    async fn execute_interactive(&self, cmd: ExecutionCommand) -> Result<i32, ExecutorError>;

    /// Whether `program` can be spawned at all.
    fn is_available(&self, program: &str) -> bool;

    /// Get executor type name for logging
    fn executor_type(&self) -> &'static str;
}
