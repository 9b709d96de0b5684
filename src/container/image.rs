//! Image building before container creation.
//!
//! When the spec carries a `build` section the image is built with the
//! runtime's `build` subcommand and tagged with the name `create` will use.
//! The build log is streamed to the caller as it is produced.

use crate::container::args::build_args;
use crate::container::{ContainerError, ContainerSpec, Environment, Result, RuntimeClient};
use crate::env::LOCAL_WORKSPACE_FOLDER;
use crate::executor::{CommandExecutor, OutputSink};
use std::path::{Path, PathBuf};
use tracing::info;

/// Builds the image described by a spec's `build` section.
pub struct ImageBuilder<'a, E: CommandExecutor> {
    client: &'a RuntimeClient<E>,
    env: &'a Environment,
}

impl<'a, E: CommandExecutor> ImageBuilder<'a, E> {
    pub fn new(client: &'a RuntimeClient<E>, env: &'a Environment) -> Self {
        Self { client, env }
    }

    /// Relative paths resolve against the workspace folder.
    fn resolve(&self, path: &str) -> PathBuf {
        let path = self.env.expand(path);
        Path::new(self.env.lookup(LOCAL_WORKSPACE_FOLDER)).join(path)
    }

    /// Build the image if the spec asks for one.
    ///
    /// Returns the tag that was built, or `None` when there is nothing to
    /// build.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Configuration`] before running anything when
    /// the context or tag is missing or the Dockerfile does not exist, and
    /// [`ContainerError::RuntimeInvocation`] when the build itself fails.
    pub async fn build(
        &self,
        spec: &ContainerSpec,
        stdout: OutputSink<'_>,
        stderr: OutputSink<'_>,
    ) -> Result<Option<String>> {
        let Some(build) = &spec.build else {
            return Ok(None);
        };

        if build.context.is_empty() {
            return Err(ContainerError::Configuration(
                "build.dockerfile set, but not build.context".to_string(),
            ));
        }
        let tag = spec.resolved_image();
        if tag.is_empty() {
            return Err(ContainerError::Configuration(
                "build.dockerfile set, but not build.target or image".to_string(),
            ));
        }
        let dockerfile = self.resolve(&build.dockerfile);
        if !dockerfile.is_file() {
            return Err(ContainerError::Configuration(format!(
                "Dockerfile not found at {}",
                dockerfile.display()
            )));
        }
        let context = self.resolve(&build.context);

        info!("Building image {} from {}", tag, dockerfile.display());
        let args = build_args(
            &dockerfile.display().to_string(),
            &context.display().to_string(),
            tag,
            &build.args,
            self.env,
        );
        self.client.build(args, stdout, stderr).await?;
        info!("Built image {}", tag);

        Ok(Some(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::BuildSpec;
    use crate::executor::RecordingExecutor;
    use crate::executor::recording::failed;
    use tempfile::TempDir;

    fn build_spec(dir: &TempDir, context: &str) -> ContainerSpec {
        std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        ContainerSpec {
            name: "localpod-app".to_string(),
            image: "app:dev".to_string(),
            build: Some(BuildSpec {
                dockerfile: "Dockerfile".to_string(),
                context: context.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn env(dir: &TempDir) -> Environment {
        Environment::new().with(LOCAL_WORKSPACE_FOLDER, dir.path().display().to_string())
    }

    #[tokio::test]
    async fn test_no_build_is_a_noop() {
        let client = RuntimeClient::new("docker", RecordingExecutor::new());
        let env = Environment::new();
        let builder = ImageBuilder::new(&client, &env);

        let built = builder
            .build(&ContainerSpec::default(), &mut tokio::io::sink(), &mut tokio::io::sink())
            .await
            .unwrap();

        assert!(built.is_none());
        assert!(client.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_context_fails_before_any_invocation() {
        let dir = TempDir::new().unwrap();
        let client = RuntimeClient::new("docker", RecordingExecutor::new());
        let env = env(&dir);
        let builder = ImageBuilder::new(&client, &env);

        let result = builder
            .build(&build_spec(&dir, ""), &mut tokio::io::sink(), &mut tokio::io::sink())
            .await;

        assert!(matches!(result, Err(ContainerError::Configuration(_))));
        assert!(client.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_dockerfile() {
        let dir = TempDir::new().unwrap();
        let client = RuntimeClient::new("docker", RecordingExecutor::new());
        let env = env(&dir);
        let builder = ImageBuilder::new(&client, &env);
        let mut spec = build_spec(&dir, ".");
        if let Some(build) = spec.build.as_mut() {
            build.dockerfile = "missing/Dockerfile".to_string();
        }

        let err = builder
            .build(&spec, &mut tokio::io::sink(), &mut tokio::io::sink())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Dockerfile not found"));
        assert!(client.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_invocation() {
        let dir = TempDir::new().unwrap();
        let client = RuntimeClient::new("docker", RecordingExecutor::new());
        let env = env(&dir);
        let builder = ImageBuilder::new(&client, &env);

        let built = builder
            .build(&build_spec(&dir, "."), &mut tokio::io::sink(), &mut tokio::io::sink())
            .await
            .unwrap();

        assert_eq!(built.as_deref(), Some("app:dev"));
        let calls = client.executor().calls();
        assert_eq!(calls.len(), 1);
        let args = &calls[0].args;
        assert_eq!(&args[..4], &["build", "--pull", "--tag", "app:dev"]);
        assert_eq!(
            args[5],
            dir.path().join("Dockerfile").display().to_string()
        );
    }

    #[tokio::test]
    async fn test_failed_build_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let executor = RecordingExecutor::new().respond("build", failed(1, "unknown instruction: FRM"));
        let client = RuntimeClient::new("docker", executor);
        let env = env(&dir);
        let builder = ImageBuilder::new(&client, &env);
        let mut log: Vec<u8> = Vec::new();

        let err = builder
            .build(&build_spec(&dir, "."), &mut tokio::io::sink(), &mut log)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ContainerError::RuntimeInvocation { ref stderr, .. } if stderr.contains("FRM")
        ));
        assert_eq!(log, b"unknown instruction: FRM");
    }
}
