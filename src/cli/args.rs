//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `up`: Reconcile, provision and attach to the project container (default)
//! - `stop`: Stop the project container
//! - `rm`: Remove the project container
//! - `show-config`: Print the resolved configuration and its fingerprint

use crate::env::{DEFAULT_RUNTIME, vars};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Up,
    Stop,
    Remove,
    ShowConfig,
}

/// Settings shared by every subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub runtime: String,
    pub config_override: Option<PathBuf>,
    pub save_config: bool,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "localpod")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reproducible per-project development containers on docker or podman")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Container runtime CLI to drive
    #[arg(long = "runtime", global = true, env = vars::RUNTIME, default_value = DEFAULT_RUNTIME)]
    pub runtime: String,

    /// Configuration file path (defaults to ./.devcontainer.json)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Do not write a configuration synthesized from the environment
    #[arg(long = "no-save-config", global = true)]
    pub no_save_config: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Create or reuse the container, provision it and attach a shell
    Up,
    /// Stop the container
    Stop,
    /// Remove the container
    Rm,
    /// Show the resolved configuration
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.command {
            Some(Commands::Up) | None => ExecutionMode::Up,
            Some(Commands::Stop) => ExecutionMode::Stop,
            Some(Commands::Rm) => ExecutionMode::Remove,
            Some(Commands::ShowConfig) => ExecutionMode::ShowConfig,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            runtime: self.runtime.clone(),
            config_override: self.config.clone(),
            save_config: !self.no_save_config,
            verbose: self.verbose,
        }
    }
}
