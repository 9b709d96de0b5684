//! In-container bootstrap.
//!
//! Two shell scripts are rendered by placeholder substitution, copied into
//! the container and marked executable: a setup script that creates the
//! interactive user with the host UID and grants it passwordless sudo, and
//! the start script that `execCommand` runs by default. The setup script is
//! then executed as `containerUser`. Both scripts are idempotent, so
//! provisioning a reused container is harmless.

use crate::container::{ContainerError, DevContainer, Result};
use crate::env::container::{SETUP_SCRIPT_PATH, START_SCRIPT_PATH};
use crate::executor::CommandExecutor;
use std::fmt;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const USERNAME_PLACEHOLDER: &str = "@USERNAME@";
const UID_PLACEHOLDER: &str = "@UID@";

const SETUP_TEMPLATE: &str = r#"#!/bin/sh
set -e
USERNAME=@USERNAME@
HOST_UID=@UID@
# ensure user is created
adduser --home "/home/$USERNAME" --gecos '' --disabled-password -u "$HOST_UID" "$USERNAME" || true
usermod --uid "$HOST_UID" "$USERNAME" || true
# passwordless sudo
addgroup sudo || true
addgroup "$USERNAME" sudo || true
mkdir -p /etc/sudoers.d
echo "$USERNAME ALL=(ALL) NOPASSWD:ALL" > "/etc/sudoers.d/$USERNAME"
if command -v apk >/dev/null; then
	apk add --no-cache sudo
fi
if command -v apt-get >/dev/null; then
	apt-get update && apt-get install -y --no-install-recommends sudo
fi
# homebrew prefix
mkdir -p /home/linuxbrew/.linuxbrew/Homebrew
chown -R "$USERNAME" /home/linuxbrew
"#;

const START_TEMPLATE: &str = r#"#!/bin/sh
USERNAME=@USERNAME@
# run the user's login shell
exec "$(awk -F: -v user="$USERNAME" '$1 == user {print $NF}' /etc/passwd)" --login
"#;

/// Provisioning step, used to report where provisioning stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Render,
    Copy,
    Chmod,
    Execute,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStep::Render => write!(f, "render"),
            ProvisionStep::Copy => write!(f, "copy"),
            ProvisionStep::Chmod => write!(f, "chmod"),
            ProvisionStep::Execute => write!(f, "execute"),
        }
    }
}

fn step_failed(step: ProvisionStep, script: &str, source: ContainerError) -> ContainerError {
    ContainerError::Provision {
        step,
        script: script.to_string(),
        source: Box::new(source),
    }
}

/// Renders and installs the bootstrap scripts.
#[derive(Debug, Clone)]
pub struct Provisioner {
    username: String,
    uid: u32,
}

impl Provisioner {
    pub fn new(username: impl Into<String>, uid: u32) -> Self {
        Self {
            username: username.into(),
            uid,
        }
    }

    /// Provisioner for `username` owned by the invoking host user.
    pub fn for_current_user(username: impl Into<String>) -> Self {
        Self::new(username, nix::unistd::Uid::current().as_raw())
    }

    fn render(&self, template: &str) -> String {
        let username = shell_escape::escape(self.username.as_str().into());
        template
            .replace(USERNAME_PLACEHOLDER, &username)
            .replace(UID_PLACEHOLDER, &self.uid.to_string())
    }

    pub fn setup_script(&self) -> String {
        self.render(SETUP_TEMPLATE)
    }

    pub fn start_script(&self) -> String {
        self.render(START_TEMPLATE)
    }

    /// Install both scripts and run the setup script.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Provision`] naming the failed step and
    /// script. Nothing already done is rolled back.
    pub async fn provision<E: CommandExecutor>(&self, container: &DevContainer<'_, E>) -> Result<()> {
        info!("Provisioning container {} for user {}", container.name(), self.username);

        self.install(container, SETUP_SCRIPT_PATH, &self.setup_script())
            .await?;
        self.install(container, START_SCRIPT_PATH, &self.start_script())
            .await?;

        let result = container
            .client()
            .exec_captured(
                container.name(),
                &container.spec().container_user,
                "/",
                &[SETUP_SCRIPT_PATH],
            )
            .await
            .map_err(|e| step_failed(ProvisionStep::Execute, SETUP_SCRIPT_PATH, e))?;
        debug!("Setup script output:\n{}", result.stdout);

        Ok(())
    }

    async fn install<E: CommandExecutor>(
        &self,
        container: &DevContainer<'_, E>,
        path: &str,
        content: &str,
    ) -> Result<()> {
        let rendered = write_temp(content).map_err(|e| step_failed(ProvisionStep::Render, path, e))?;

        container
            .client()
            .copy_into(rendered.path(), container.name(), path)
            .await
            .map_err(|e| step_failed(ProvisionStep::Copy, path, e))?;

        container
            .client()
            .exec_captured(
                container.name(),
                &container.spec().container_user,
                "/",
                &["chmod", "+x", path],
            )
            .await
            .map_err(|e| step_failed(ProvisionStep::Chmod, path, e))?;

        debug!("Installed {}", path);
        Ok(())
    }
}

fn write_temp(content: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("localpod-")
        .suffix(".sh")
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}
