//! CLI-specific functionality for localpod
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, Commands, ExecutionMode, SessionConfig};
pub use config::{ConfigDiscovery, ConfigSource, LoadedConfig};
