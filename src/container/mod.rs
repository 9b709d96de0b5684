//! Container reconciliation engine.
//!
//! This module turns a declarative [`ContainerSpec`] into an idempotent
//! sequence of runtime CLI invocations. Nothing is persisted locally: the
//! state of the world is recovered by inspecting the runtime and comparing
//! the fingerprint recorded on the existing container with the fingerprint
//! of the current spec.
//!
//! ## Architecture
//!
//! The container module is organized into several components:
//!
//! - [`config`]: the specification model, its defaults and validation
//! - [`environment`]: read-only variable lookup and `${VAR}` expansion
//! - [`fingerprint`]: canonical serialization and content hashing
//! - [`args`]: translation of the spec into `create` / `exec` arguments
//! - [`client`]: typed wrappers over the runtime subcommands
//! - [`image`]: optional image build before creation
//! - [`reconciler`]: the reuse / rebuild / create state machine
//! - [`provision`]: bootstrap scripts copied into and run inside the container
//! - [`lifecycle`]: start, exec, stop and remove on a reconciled container
//!
//! ## Usage
//!
//! ```rust,no_run
//! use localpod::container::{ContainerSpec, Environment, Reconciler, RuntimeClient};
//! use localpod::executor::HostExecutor;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let workspace = Path::new("/src/app");
//!     let env = Environment::from_process().with("localWorkspaceFolder", "/src/app");
//!     let spec = ContainerSpec::default().finalize(workspace)?;
//!
//!     let client = RuntimeClient::new("docker", HostExecutor::new());
//!     let reconciled = Reconciler::new(&client, &env)
//!         .reconcile(&spec, &mut tokio::io::stdout(), &mut tokio::io::stderr())
//!         .await?;
//!
//!     reconciled.container.start().await?;
//!     let code = reconciled.container.exec().await?;
//!     std::process::exit(code);
//! }
//! ```

pub mod args;
pub mod client;
pub mod config;
pub mod environment;
pub mod fingerprint;
pub mod image;
pub mod lifecycle;
pub mod provision;
pub mod reconciler;

pub use client::{RuntimeClient, RuntimeContainer};
pub use config::{BuildSpec, ContainerSpec, ShutdownAction};
pub use environment::Environment;
pub use fingerprint::Fingerprint;
pub use image::ImageBuilder;
pub use lifecycle::DevContainer;
pub use provision::{ProvisionStep, Provisioner};
pub use reconciler::{Observation, Outcome, Reconciled, Reconciler};

use crate::executor::ExecutorError;

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Malformed or contradictory specification
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The runtime CLI is not installed or cannot be spawned
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A runtime subcommand exited non-zero
    #[error("`{command}` exited with status {status}: {}", .stderr.trim())]
    RuntimeInvocation {
        /// The invocation, shell-quoted
        command: String,
        /// Exit code of the runtime CLI
        status: i32,
        /// Captured standard error
        stderr: String,
    },

    /// The runtime reported something that should be impossible
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A provisioning step failed
    #[error("could not {step} {script}")]
    Provision {
        step: ProvisionStep,
        script: String,
        #[source]
        source: Box<ContainerError>,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ExecutorError> for ContainerError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Unavailable(program) => ContainerError::RuntimeUnavailable(format!(
                "could not run '{}', is it installed and on PATH?",
                program
            )),
            ExecutorError::IoError(e) => ContainerError::IoError(e),
        }
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
