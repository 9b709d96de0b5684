//! Native host command execution.
//!
//! Executes commands directly on the host system using `tokio::process::Command`.

use super::{CommandExecutor, ExecutionCommand, ExecutionResult, ExecutorError, OutputSink};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;
use which::which;

/// Executes commands directly on the host system
#[derive(Debug, Clone)]
pub struct HostExecutor;

impl HostExecutor {
    /// Create a new host executor
    pub fn new() -> Self {
        Self
    }

    fn command(cmd: &ExecutionCommand) -> Command {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        command
    }
}

impl Default for HostExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_error(program: &str, err: io::Error) -> ExecutorError {
    if err.kind() == io::ErrorKind::NotFound {
        ExecutorError::Unavailable(program.to_string())
    } else {
        ExecutorError::IoError(err)
    }
}

/// Copy `reader` into `sink` chunk by chunk, optionally keeping a copy.
async fn forward<R>(mut reader: R, sink: OutputSink<'_>, keep: bool) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        sink.flush().await?;
        if keep {
            captured.extend_from_slice(&buf[..n]);
        }
    }
    Ok(captured)
}

#[async_trait]
impl CommandExecutor for HostExecutor {
    async fn execute(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError> {
        debug!("Executing command on host: {}", cmd);

        let start = Instant::now();
        let output = Self::command(&cmd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(&cmd.program, e))?;

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    async fn execute_streaming(
        &self,
        cmd: ExecutionCommand,
        stdout: OutputSink<'_>,
        stderr: OutputSink<'_>,
    ) -> Result<ExecutionResult, ExecutorError> {
        debug!("Executing streamed command on host: {}", cmd);

        let start = Instant::now();
        let mut child = Self::command(&cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&cmd.program, e))?;

        let child_stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not piped"))?;
        let child_stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not piped"))?;

        let (_, captured_stderr) = tokio::try_join!(
            forward(child_stdout, stdout, false),
            forward(child_stderr, stderr, true),
        )?;
        let status = child.wait().await?;

        Ok(ExecutionResult {
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&captured_stderr).to_string(),
            exit_code: status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    async fn execute_interactive(&self, cmd: ExecutionCommand) -> Result<i32, ExecutorError> {
        debug!("Executing interactive command on host: {}", cmd);

        let status = Self::command(&cmd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(&cmd.program, e))?;

        Ok(status.code().unwrap_or(-1))
    }

    fn is_available(&self, program: &str) -> bool {
        which(program).is_ok()
    }

    fn executor_type(&self) -> &'static str {
        "host"
    }
}
