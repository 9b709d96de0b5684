//! # localpod
//!
//! Reproducible per-project development containers, driven through the
//! `docker` (or CLI-compatible `podman`) command line.
//!
//! Each run reconciles the runtime with the project's declarative
//! configuration: an existing container is reused when it was created from
//! the same configuration, rebuilt when the configuration changed, and
//! created when missing. The decision is made from a fingerprint stored on
//! the container itself, so localpod keeps no state of its own.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: specification model, fingerprinting, argument
//!   translation and the reconcile / provision / lifecycle engine
//! - **[`executor`]**: the process-spawning seam every runtime call goes through
//! - **[`cli`]**: argument parsing and configuration discovery
//! - **[`integration`]**: the `up`, `stop`, `rm` and `show-config` flows
//! - **[`env`]**: file names, variable names and in-container paths
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use localpod::cli::SessionConfig;
//! use localpod::integration::Session;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::from_config(&SessionConfig {
//!         runtime: "docker".to_string(),
//!         config_override: None,
//!         save_config: true,
//!         verbose: false,
//!     })?;
//!
//!     let code = session
//!         .up(&mut tokio::io::stdout(), &mut tokio::io::stderr())
//!         .await?;
//!     std::process::exit(code);
//! }
//! ```

/// Container reconciliation engine.
///
/// Turns a [`container::ContainerSpec`] into runtime invocations and
/// decides whether to reuse, rebuild or create the project container.
pub mod container;

/// Command execution abstraction.
///
/// Spawns runtime CLI processes in captured, streamed or interactive mode.
pub mod executor;

/// High-level session workflow.
pub mod integration;

/// Environment constants and path utilities.
///
/// Centralizes all hardcoded paths and names used throughout the
/// application for easier maintenance and consistency.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use container::{ContainerError, ContainerSpec, Environment, Fingerprint};
pub use integration::Session;
