//! Runtime CLI client.
//!
//! Wraps each runtime subcommand (`inspect`, `create`, `start`, `exec`,
//! `stop`, `rm`, `cp`, `build`) in a typed method and classifies the
//! runtime's failures. The actual process spawning is delegated to a
//! [`CommandExecutor`], which is what tests replace.

use crate::container::{ContainerError, Fingerprint, Result};
use crate::env::container::{FINGERPRINT_ENV_KEY, RUNTIME_FAILURE_STATUS};
use crate::executor::{CommandExecutor, ExecutionCommand, ExecutionResult, HostExecutor, OutputSink};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Container as reported by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContainer {
    /// Full container ID
    pub id: String,
    /// Container name without the leading `/`
    pub name: String,
    /// Fingerprint found in the container's environment, if any
    pub recorded_fingerprint: Option<Fingerprint>,
}

impl RuntimeContainer {
    /// First 12 characters of the ID, as the runtime prints it
    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Config", default)]
    config: Option<InspectConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct InspectConfig {
    #[serde(rename = "Env", default)]
    env: Option<Vec<String>>,
}

impl From<InspectEntry> for RuntimeContainer {
    fn from(entry: InspectEntry) -> Self {
        let recorded_fingerprint = entry
            .config
            .and_then(|config| config.env)
            .unwrap_or_default()
            .iter()
            .filter_map(|var| var.split_once('='))
            .find(|(key, _)| *key == FINGERPRINT_ENV_KEY)
            .map(|(_, value)| Fingerprint::recorded(value));

        Self {
            id: entry.id,
            name: entry.name.trim_start_matches('/').to_string(),
            recorded_fingerprint,
        }
    }
}

fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("no such container") || stderr.contains("no such object")
}

impl ContainerError {
    /// Whether the runtime reported that the container does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::RuntimeInvocation { stderr, .. } if is_not_found(stderr))
    }

    /// Whether the runtime refused a create because the name is taken.
    pub fn is_name_conflict(&self) -> bool {
        matches!(
            self,
            ContainerError::RuntimeInvocation { stderr, .. }
                if stderr.to_lowercase().contains("is already in use")
        )
    }
}

/// Typed access to the runtime CLI (`docker`, `podman`, ...).
pub struct RuntimeClient<E: CommandExecutor = HostExecutor> {
    program: String,
    executor: E,
}

impl<E: CommandExecutor> RuntimeClient<E> {
    /// Create a client for the given runtime program.
    pub fn new(program: impl Into<String>, executor: E) -> Self {
        Self {
            program: program.into(),
            executor,
        }
    }

    /// Name of the runtime program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Fail with [`ContainerError::RuntimeUnavailable`] unless the runtime
    /// program can be found.
    pub fn ensure_available(&self) -> Result<()> {
        if self.executor.is_available(&self.program) {
            Ok(())
        } else {
            Err(ContainerError::RuntimeUnavailable(format!(
                "'{}' was not found on PATH",
                self.program
            )))
        }
    }

    /// Get the underlying executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn command(&self, args: Vec<String>) -> ExecutionCommand {
        ExecutionCommand::new(&self.program, args)
    }

    fn check(cmd: &ExecutionCommand, result: ExecutionResult) -> Result<ExecutionResult> {
        debug!(
            "`{}` finished with status {} in {:?}",
            cmd, result.exit_code, result.duration
        );
        if result.success() {
            return Ok(result);
        }
        let stderr = if result.stderr.trim().is_empty() {
            result.stdout
        } else {
            result.stderr
        };
        Err(ContainerError::RuntimeInvocation {
            command: cmd.to_string(),
            status: result.exit_code,
            stderr,
        })
    }

    /// Run a subcommand, capturing its output.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::RuntimeInvocation`] on a non-zero exit and
    /// [`ContainerError::RuntimeUnavailable`] when the program is missing.
    pub async fn run(&self, args: Vec<String>) -> Result<ExecutionResult> {
        let cmd = self.command(args);
        let result = self.executor.execute(cmd.clone()).await?;
        Self::check(&cmd, result)
    }

    /// Look up a container by name.
    ///
    /// Returns `Ok(None)` when the runtime says there is no such container.
    ///
    /// # Errors
    ///
    /// Any other inspection failure is a [`ContainerError::RuntimeInvocation`];
    /// output that does not describe exactly one container is a
    /// [`ContainerError::InvariantViolation`].
    pub async fn inspect(&self, name: &str) -> Result<Option<RuntimeContainer>> {
        let args = vec![
            "inspect".to_string(),
            "--type".to_string(),
            "container".to_string(),
            name.to_string(),
        ];
        let result = match self.run(args).await {
            Ok(result) => result,
            Err(e) if e.is_not_found() => {
                debug!("No container named {}", name);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let entries: Vec<InspectEntry> = serde_json::from_str(&result.stdout).map_err(|e| {
            ContainerError::InvariantViolation(format!(
                "could not decode inspect output for {}: {}",
                name, e
            ))
        })?;
        if entries.len() != 1 {
            return Err(ContainerError::InvariantViolation(format!(
                "expected exactly one container named {}, runtime reported {}",
                name,
                entries.len()
            )));
        }

        Ok(entries.into_iter().next().map(RuntimeContainer::from))
    }

    /// Create a container from fully translated `create` arguments and
    /// return its ID.
    pub async fn create(&self, args: Vec<String>) -> Result<String> {
        let result = self.run(args).await?;
        Ok(result.stdout.trim().to_string())
    }

    /// Start a container. Starting a running container is a no-op.
    pub async fn start(&self, name: &str) -> Result<()> {
        self.run(vec!["start".to_string(), name.to_string()]).await?;
        Ok(())
    }

    /// Stop a container.
    pub async fn stop(&self, name: &str) -> Result<()> {
        self.run(vec!["stop".to_string(), name.to_string()]).await?;
        Ok(())
    }

    /// Force-remove a container. A container that is already gone counts as
    /// removed.
    pub async fn remove(&self, id_or_name: &str) -> Result<()> {
        match self
            .run(vec!["rm".to_string(), "-f".to_string(), id_or_name.to_string()])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Container {} was already removed", id_or_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Copy a local file into the container's filesystem.
    pub async fn copy_into(&self, local: &Path, container: &str, dest: &str) -> Result<()> {
        self.run(vec![
            "cp".to_string(),
            local.display().to_string(),
            format!("{}:{}", container, dest),
        ])
        .await?;
        Ok(())
    }

    /// Run a non-interactive command inside a running container, capturing
    /// its output.
    pub async fn exec_captured(
        &self,
        container: &str,
        user: &str,
        workdir: &str,
        command: &[&str],
    ) -> Result<ExecutionResult> {
        let mut args = vec![
            "exec".to_string(),
            "--user".to_string(),
            user.to_string(),
            "--workdir".to_string(),
            workdir.to_string(),
            container.to_string(),
        ];
        args.extend(command.iter().map(|s| s.to_string()));
        self.run(args).await
    }

    /// Run fully translated `exec` arguments with stdio attached and return
    /// the exit code of the session.
    ///
    /// Status 125 comes from the runtime rather than the session and is
    /// reported as [`ContainerError::RuntimeInvocation`]. Its diagnostic has
    /// already gone to the terminal.
    pub async fn exec_interactive(&self, args: Vec<String>) -> Result<i32> {
        let cmd = self.command(args);
        let code = self.executor.execute_interactive(cmd.clone()).await?;
        debug!("`{}` exited with {}", cmd, code);
        if code == RUNTIME_FAILURE_STATUS {
            return Err(ContainerError::RuntimeInvocation {
                command: cmd.to_string(),
                status: code,
                stderr: "the runtime could not run the session, see its output above".to_string(),
            });
        }
        Ok(code)
    }

    /// Run fully translated `build` arguments, streaming the build log.
    pub async fn build(
        &self,
        args: Vec<String>,
        stdout: OutputSink<'_>,
        stderr: OutputSink<'_>,
    ) -> Result<()> {
        let cmd = self.command(args);
        let result = self
            .executor
            .execute_streaming(cmd.clone(), stdout, stderr)
            .await?;
        Self::check(&cmd, result)?;
        Ok(())
    }
}
