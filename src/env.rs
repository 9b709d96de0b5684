//! Environment constants and path utilities for localpod.
//!
//! This module centralizes the hardcoded file names, environment variable
//! names and in-container paths used throughout the application, making them
//! easier to maintain and modify.

use std::path::{Path, PathBuf};

/// Project configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = ".devcontainer.json";

/// Default runtime CLI program
pub const DEFAULT_RUNTIME: &str = "docker";

/// Key under which the invoking working directory is seeded into the
/// execution environment
pub const LOCAL_WORKSPACE_FOLDER: &str = "localWorkspaceFolder";

/// Prefix stripped from environment lookups (`${localEnv:HOME}`)
pub const LOCAL_ENV_PREFIX: &str = "localEnv:";

/// Environment variables recognized when no config file exists
pub mod vars {
    /// Overrides the container image
    pub const IMAGE: &str = "LOCALPOD_IMAGE";

    /// Dotfiles repository URL, forwarded into the container environment
    pub const DOTFILES_REPO: &str = "DOTFILES_REPO";

    /// `;`-separated extra mount specs
    pub const MOUNTS: &str = "LOCALPOD_MOUNTS";

    /// `;`-separated `KEY=VALUE` pairs for the interactive session
    pub const ENV_VARS: &str = "LOCALPOD_ENV_VARS";

    /// Selects the runtime CLI program
    pub const RUNTIME: &str = "LOCALPOD_RUNTIME";

    /// Separator used by the list-valued variables above
    pub const LIST_SEPARATOR: char = ';';
}

/// Names and paths that live inside the container
pub mod container {
    /// Reserved environment key carrying the spec fingerprint
    pub const FINGERPRINT_ENV_KEY: &str = "LOCALPOD_CONFIG_FINGERPRINT";

    /// Hostname given to every created container
    pub const HOSTNAME: &str = "localpod";

    /// Entrypoint used when the command is overridden
    pub const IDLE_ENTRYPOINT: &str = "/bin/sh";

    /// Keeps the container alive until it receives SIGTERM
    pub const IDLE_COMMAND: &str =
        "echo Container started ; trap \"exit 0\" 15; while sleep 1 & wait $!; do :; done";

    /// Where the setup script is copied
    pub const SETUP_SCRIPT_PATH: &str = "/tmp/localpod-setup.sh";

    /// Where the start script is copied; the default exec command
    pub const START_SCRIPT_PATH: &str = "/start";

    /// Status `exec` reports when the runtime itself failed
    pub const RUNTIME_FAILURE_STATUS: i32 = 125;
}

/// Build the config file path from a working directory
pub fn config_file_path(working_dir: &Path) -> PathBuf {
    working_dir.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_path() {
        assert_eq!(
            config_file_path(Path::new("/home/user/project")),
            Path::new("/home/user/project/.devcontainer.json")
        );
    }

    #[test]
    fn test_idle_command_keeps_shell_specials() {
        assert!(container::IDLE_COMMAND.contains("wait $!"));
    }
}
