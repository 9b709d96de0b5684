//! # Session Workflow
//!
//! Ties configuration discovery, the reconciler, the provisioner and the
//! lifecycle operations into the flows behind each subcommand.
//!
//! ## `up`
//!
//! ```text
//! runtime on PATH? → load config → reconcile → start → provision → exec
//!                                                                   │
//!                                          shutdownAction: stop ◄───┘
//! ```
//!
//! `stop` and `rm` also check for the runtime first, then act on whatever
//! container the runtime holds under the configured name. `show-config`
//! resolves the configuration without touching the runtime or the config
//! file, so it works where no runtime is installed.

use crate::cli::{ConfigDiscovery, ConfigSource, LoadedConfig, SessionConfig};
use crate::container::{
    DevContainer, Environment, Fingerprint, Provisioner, Reconciler, RuntimeClient,
    ShutdownAction,
};
use crate::env::LOCAL_WORKSPACE_FOLDER;
use crate::executor::{CommandExecutor, HostExecutor, OutputSink};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolved configuration as shown by `show-config`
#[derive(Debug, Clone)]
pub struct ConfigReport {
    pub path: PathBuf,
    pub source: ConfigSource,
    pub fingerprint: Fingerprint,
    pub json: String,
}

/// One invocation of the tool against one project directory.
pub struct Session<E: CommandExecutor = HostExecutor> {
    client: RuntimeClient<E>,
    environment: Environment,
    working_dir: PathBuf,
    config_path: PathBuf,
    save_config: bool,
}

impl Session<HostExecutor> {
    /// Session for the current directory and process environment.
    ///
    /// # Errors
    ///
    /// Fails when the working directory cannot be determined.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("could not determine the working directory")?;
        let config_path =
            ConfigDiscovery::config_path(&working_dir, config.config_override.as_deref());

        Ok(Self::new(
            RuntimeClient::new(config.runtime.clone(), HostExecutor::new()),
            Environment::from_process(),
            working_dir,
            config_path,
            config.save_config,
        ))
    }
}

impl<E: CommandExecutor> Session<E> {
    /// The environment is seeded with `localWorkspaceFolder=<working_dir>`.
    pub fn new(
        client: RuntimeClient<E>,
        environment: Environment,
        working_dir: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        save_config: bool,
    ) -> Self {
        let working_dir = working_dir.into();
        let environment =
            environment.with(LOCAL_WORKSPACE_FOLDER, working_dir.display().to_string());
        Self {
            client,
            environment,
            working_dir,
            config_path: config_path.into(),
            save_config,
        }
    }

    pub fn client(&self) -> &RuntimeClient<E> {
        &self.client
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn load_config(&self, save: bool) -> Result<LoadedConfig> {
        ConfigDiscovery::load(&self.config_path, &self.working_dir, &self.environment, save)
            .context("could not load configuration")
    }

    /// Reconcile, start, provision and attach. Returns the exit code of the
    /// interactive session.
    pub async fn up(&self, stdout: OutputSink<'_>, stderr: OutputSink<'_>) -> Result<i32> {
        self.client.ensure_available()?;
        let config = self.load_config(self.save_config)?;
        let spec = &config.spec;

        let reconciled = Reconciler::new(&self.client, &self.environment)
            .reconcile(spec, stdout, stderr)
            .await
            .with_context(|| format!("could not prepare container {}", spec.name))?;
        info!(
            "Container {} {} ({})",
            spec.name,
            reconciled.outcome,
            reconciled.container.id()
        );
        let container = reconciled.container;

        container
            .start()
            .await
            .with_context(|| format!("could not start container {}", spec.name))?;
        Provisioner::for_current_user(&spec.remote_user)
            .provision(&container)
            .await
            .with_context(|| format!("could not provision container {}", spec.name))?;

        let code = container
            .exec()
            .await
            .with_context(|| format!("could not attach to container {}", spec.name))?;
        info!("Session in {} exited with {}", spec.name, code);

        if spec.shutdown_action == ShutdownAction::StopContainer {
            container
                .stop()
                .await
                .with_context(|| format!("could not stop container {}", spec.name))?;
        }

        Ok(code)
    }

    async fn existing(&self) -> Result<Option<DevContainer<'_, E>>> {
        let config = self.load_config(false)?;
        let found = self
            .client
            .inspect(&config.spec.name)
            .await
            .with_context(|| format!("could not inspect container {}", config.spec.name))?;
        if found.is_none() {
            info!("No container named {}", config.spec.name);
        }
        Ok(found.map(|c| DevContainer::new(&self.client, &self.environment, c.id, config.spec)))
    }

    /// Stop the project container if it exists.
    pub async fn stop(&self) -> Result<()> {
        self.client.ensure_available()?;
        if let Some(container) = self.existing().await? {
            container
                .stop()
                .await
                .with_context(|| format!("could not stop container {}", container.name()))?;
        }
        Ok(())
    }

    /// Remove the project container if it exists.
    pub async fn remove(&self) -> Result<()> {
        self.client.ensure_available()?;
        if let Some(container) = self.existing().await? {
            container
                .remove()
                .await
                .with_context(|| format!("could not remove container {}", container.name()))?;
        }
        Ok(())
    }

    /// Resolve the configuration without saving it.
    pub fn show_config(&self) -> Result<ConfigReport> {
        let config = self.load_config(false)?;
        let fingerprint =
            Fingerprint::of(&config.spec).context("could not fingerprint configuration")?;
        let json = config
            .spec
            .to_json_pretty()
            .context("could not serialize configuration")?;
        Ok(ConfigReport {
            path: config.path,
            source: config.source,
            fingerprint,
            json,
        })
    }
}
