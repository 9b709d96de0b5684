//! Configuration discovery and loading
//!
//! The project configuration is `./.devcontainer.json` (or the `--config`
//! override). When that file does not exist, a spec is synthesized from the
//! built-in defaults and the recognized `LOCALPOD_*` variables, and written
//! back so the next run reads the same configuration from disk.

use crate::container::{ContainerError, ContainerSpec, Environment, Result};
use crate::env::{self, vars};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a resolved configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from the config file
    File,
    /// Synthesized from environment variables; `saved` if it was written out
    Environment { saved: bool },
}

/// A finalized spec together with its origin
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub spec: ContainerSpec,
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Config file location for a working directory and optional override
    pub fn config_path(working_dir: &Path, config_override: Option<&Path>) -> PathBuf {
        match config_override {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => working_dir.join(path),
            None => env::config_file_path(working_dir),
        }
    }

    /// Load the spec from `path`, or synthesize it from `environment` when
    /// the file does not exist. The result is finalized against
    /// `working_dir`.
    pub fn load(
        path: &Path,
        working_dir: &Path,
        environment: &Environment,
        save: bool,
    ) -> Result<LoadedConfig> {
        match File::open(path) {
            Ok(file) => {
                info!("Loading configuration from: {}", path.display());
                let spec = ContainerSpec::from_reader(io::BufReader::new(file))
                    .map_err(|e| match e {
                        ContainerError::Configuration(msg) => {
                            ContainerError::Configuration(format!("{}: {}", path.display(), msg))
                        }
                        other => other,
                    })?
                    .finalize(working_dir)?;
                Ok(LoadedConfig {
                    spec,
                    path: path.to_path_buf(),
                    source: ConfigSource::File,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No configuration file at {}, using environment and defaults",
                    path.display()
                );
                let spec = Self::from_environment(environment)?.finalize(working_dir)?;
                let saved = save && Self::save(&spec, path);
                Ok(LoadedConfig {
                    spec,
                    path: path.to_path_buf(),
                    source: ConfigSource::Environment { saved },
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Build a spec from the defaults and the `LOCALPOD_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Configuration`] for a `LOCALPOD_ENV_VARS`
    /// entry without `=`.
    pub fn from_environment(environment: &Environment) -> Result<ContainerSpec> {
        let mut spec = ContainerSpec::default();

        if let Some(image) = environment.get(vars::IMAGE).filter(|v| !v.is_empty()) {
            debug!("Using image from {}: {}", vars::IMAGE, image);
            spec.image = image.to_string();
        }
        if let Some(repo) = environment.get(vars::DOTFILES_REPO).filter(|v| !v.is_empty()) {
            spec.container_env
                .insert(vars::DOTFILES_REPO.to_string(), repo.to_string());
        }
        if let Some(mounts) = environment.get(vars::MOUNTS) {
            spec.mounts.extend(
                mounts
                    .split(vars::LIST_SEPARATOR)
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(assignments) = environment.get(vars::ENV_VARS) {
            let remote = Environment::parse_assignments(assignments.split(vars::LIST_SEPARATOR))?;
            spec.remote_env
                .extend(remote.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }

        Ok(spec)
    }

    /// Write the spec as tab-indented JSON. Failures are logged, not fatal.
    pub fn save(spec: &ContainerSpec, path: &Path) -> bool {
        let written = spec
            .to_json_pretty()
            .and_then(|json| fs::write(path, json + "\n").map_err(ContainerError::from));
        match written {
            Ok(()) => {
                info!("Saved configuration to {}", path.display());
                true
            }
            Err(e) => {
                warn!("Could not save configuration to {}: {}", path.display(), e);
                false
            }
        }
    }
}
