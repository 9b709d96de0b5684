//! Scripted executor for tests.
//!
//! Records every command it is asked to run and answers from per-subcommand
//! queues of canned results. A subcommand with nothing queued succeeds with
//! empty output.

use super::{CommandExecutor, ExecutionCommand, ExecutionResult, ExecutorError, OutputSink};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::io::AsyncWriteExt;

/// Executor that never spawns a process.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<ExecutionCommand>>,
    responses: Mutex<HashMap<String, VecDeque<ExecutionResult>>>,
    missing: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Successful result with the given stdout.
pub fn ok(stdout: impl Into<String>) -> ExecutionResult {
    ExecutionResult {
        stdout: stdout.into(),
        ..Default::default()
    }
}

/// Failed result with the given exit code and stderr.
pub fn failed(exit_code: i32, stderr: impl Into<String>) -> ExecutionResult {
    ExecutionResult {
        stderr: stderr.into(),
        exit_code,
        ..Default::default()
    }
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next invocation of `subcommand`.
    pub fn respond(self, subcommand: &str, result: ExecutionResult) -> Self {
        lock(&self.responses)
            .entry(subcommand.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Report the runtime program as not installed.
    pub fn unavailable(mut self) -> Self {
        self.missing = true;
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<ExecutionCommand> {
        lock(&self.calls).clone()
    }

    /// Subcommand of every command run so far, in order.
    pub fn subcommands(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|cmd| cmd.subcommand().map(str::to_string))
            .collect()
    }

    /// How many times `subcommand` was run.
    pub fn count(&self, subcommand: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|cmd| cmd.subcommand() == Some(subcommand))
            .count()
    }

    fn record(&self, cmd: ExecutionCommand) -> ExecutionResult {
        let result = cmd
            .subcommand()
            .and_then(|sub| lock(&self.responses).get_mut(sub)?.pop_front())
            .unwrap_or_default();
        lock(&self.calls).push(cmd);
        result
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError> {
        Ok(self.record(cmd))
    }

    async fn execute_streaming(
        &self,
        cmd: ExecutionCommand,
        stdout: OutputSink<'_>,
        stderr: OutputSink<'_>,
    ) -> Result<ExecutionResult, ExecutorError> {
        let mut result = self.record(cmd);
        stdout.write_all(result.stdout.as_bytes()).await?;
        stderr.write_all(result.stderr.as_bytes()).await?;
        result.stdout.clear();
        Ok(result)
    }

    async fn execute_interactive(&self, cmd: ExecutionCommand) -> Result<i32, ExecutorError> {
        Ok(self.record(cmd).exit_code)
    }

    fn is_available(&self, _program: &str) -> bool {
        !self.missing
    }

    fn executor_type(&self) -> &'static str {
        "recording"
    }
}
