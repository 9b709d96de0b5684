//! Lifecycle operations on a reconciled container.

use crate::container::args::exec_args;
use crate::container::{ContainerSpec, Environment, Result, RuntimeClient};
use crate::executor::CommandExecutor;
use tracing::info;

/// Handle to the container that realizes a spec.
pub struct DevContainer<'a, E: CommandExecutor> {
    client: &'a RuntimeClient<E>,
    env: &'a Environment,
    id: String,
    spec: ContainerSpec,
}

impl<'a, E: CommandExecutor> DevContainer<'a, E> {
    pub fn new(
        client: &'a RuntimeClient<E>,
        env: &'a Environment,
        id: impl Into<String>,
        spec: ContainerSpec,
    ) -> Self {
        Self {
            client,
            env,
            id: id.into(),
            spec,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    pub fn client(&self) -> &RuntimeClient<E> {
        self.client
    }

    /// Start the container. Starting a running container is a no-op.
    pub async fn start(&self) -> Result<()> {
        info!("Starting container {}", self.name());
        self.client.start(self.name()).await
    }

    /// Attach an interactive session running `execCommand` and return its
    /// exit code. A non-zero exit of the session is not an error; a failure
    /// of the runtime itself is.
    pub async fn exec(&self) -> Result<i32> {
        info!("Attaching to container {}", self.name());
        self.client
            .exec_interactive(exec_args(&self.spec, self.env))
            .await
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping container {}", self.name());
        self.client.stop(self.name()).await
    }

    /// Force-remove the container.
    pub async fn remove(&self) -> Result<()> {
        info!("Removing container {}", self.name());
        self.client.remove(&self.id).await
    }
}
