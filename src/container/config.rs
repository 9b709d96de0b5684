//! Declarative container specification.
//!
//! [`ContainerSpec`] mirrors the subset of the `devcontainer.json` format that
//! localpod understands. It is decoded strictly (unknown fields are rejected)
//! over built-in defaults, normalized, and validated before anything touches
//! the runtime.

use crate::container::{ContainerError, Result};
use crate::env::container::{FINGERPRINT_ENV_KEY, START_SCRIPT_PATH};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

/// Default image when neither the config nor the environment names one
pub const DEFAULT_IMAGE: &str = "docker.io/bottlerocketlabs/localpod-base:latest";

/// Default workspace bind mount
pub const DEFAULT_WORKSPACE_MOUNT: &str =
    "source=${localWorkspaceFolder},target=/workspace,type=bind,consistency=cached";

/// Default in-container working directory
pub const DEFAULT_WORKSPACE_FOLDER: &str = "/workspace";

/// Default interactive user
pub const DEFAULT_REMOTE_USER: &str = "dev";

/// Default provisioning user
pub const DEFAULT_CONTAINER_USER: &str = "root";

/// Prefix of names derived from the project directory
pub const PROJECT_NAME_PREFIX: &str = "localpod";

/// Hex digits of the workspace path digest appended to derived names
const PROJECT_DIGEST_LEN: usize = 8;

#[allow(clippy::expect_used)]
static CONTAINER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static POSIX_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_-]{0,30}\$?$").expect("constant regex pattern is valid")
});

/// What happens to the container when the interactive session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShutdownAction {
    /// Leave the container running
    None,
    /// Stop the container
    #[default]
    StopContainer,
}

/// Image build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSpec {
    /// Path to the Dockerfile
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dockerfile: String,
    /// Build context directory
    #[serde(skip_serializing_if = "String::is_empty")]
    pub context: String,
    /// `--build-arg` values, expanded against the environment at build time
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
    /// Tag given to the built image; falls back to `image`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
}

impl BuildSpec {
    pub fn is_empty(&self) -> bool {
        self.dockerfile.is_empty()
            && self.context.is_empty()
            && self.args.is_empty()
            && self.target.is_empty()
    }
}

/// Desired state of the development container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerSpec {
    /// Container name; derived from the project directory when empty
    pub name: String,
    /// Pre-built image reference
    pub image: String,
    /// Optional image build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Variables set on the container at create time
    pub container_env: BTreeMap<String, String>,
    /// Variables set on every interactive exec
    pub remote_env: BTreeMap<String, String>,
    /// User that provisions the container
    pub container_user: String,
    /// User for interactive sessions
    pub remote_user: String,
    /// Raw `--mount` specs, in order
    pub mounts: Vec<String>,
    /// Workspace `--mount` spec; skipped when empty
    pub workspace_mount: String,
    /// In-container working directory
    pub workspace_folder: String,
    /// Extra raw `create` flags
    pub run_args: Vec<String>,
    /// Replace the image command with an idle loop
    pub override_command: bool,
    /// Command run on interactive attach
    pub exec_command: Vec<String>,
    pub shutdown_action: ShutdownAction,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            image: DEFAULT_IMAGE.to_string(),
            build: None,
            container_env: BTreeMap::new(),
            remote_env: BTreeMap::new(),
            container_user: DEFAULT_CONTAINER_USER.to_string(),
            remote_user: DEFAULT_REMOTE_USER.to_string(),
            mounts: Vec::new(),
            workspace_mount: DEFAULT_WORKSPACE_MOUNT.to_string(),
            workspace_folder: DEFAULT_WORKSPACE_FOLDER.to_string(),
            run_args: Vec::new(),
            override_command: true,
            exec_command: vec![START_SCRIPT_PATH.to_string()],
            shutdown_action: ShutdownAction::default(),
        }
    }
}

impl ContainerSpec {
    /// Decode a spec strictly from JSON, layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Configuration`] for malformed JSON, unknown
    /// fields or invalid enum values.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| ContainerError::Configuration(format!("invalid configuration: {}", e)))
    }

    /// Decode a spec strictly from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    /// Serialize as tab-indented JSON, the format written to the config file.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer).map_err(|e| {
            ContainerError::Configuration(format!("could not serialize configuration: {}", e))
        })?;
        String::from_utf8(buf).map_err(|e| {
            ContainerError::Configuration(format!("could not serialize configuration: {}", e))
        })
    }

    /// Fill in derived values, normalize and validate.
    ///
    /// An empty `name` becomes the project name of `workspace`, and a build
    /// section with every field empty is dropped.
    pub fn finalize(mut self, workspace: &Path) -> Result<Self> {
        if self.name.is_empty() {
            self.name = project_name(workspace);
        }
        if self.build.as_ref().is_some_and(BuildSpec::is_empty) {
            self.build = None;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check the spec for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Configuration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ContainerError::Configuration(msg));

        if !CONTAINER_NAME.is_match(&self.name) {
            return invalid(format!("invalid container name '{}'", self.name));
        }
        if let Some(build) = &self.build {
            if build.dockerfile.is_empty() {
                return invalid("build.context set, but not build.dockerfile".to_string());
            }
            if build.context.is_empty() {
                return invalid("build.dockerfile set, but not build.context".to_string());
            }
            if build.target.is_empty() && self.image.is_empty() {
                return invalid("build.dockerfile set, but not build.target or image".to_string());
            }
        } else if self.image.is_empty() {
            return invalid("image is required when no build is configured".to_string());
        }
        if self.container_env.contains_key(FINGERPRINT_ENV_KEY) {
            return invalid(format!(
                "containerEnv may not set the reserved key {}",
                FINGERPRINT_ENV_KEY
            ));
        }
        if self.container_user.is_empty() {
            return invalid("containerUser may not be empty".to_string());
        }
        if !POSIX_USER.is_match(&self.remote_user) {
            return invalid(format!("invalid remoteUser '{}'", self.remote_user));
        }
        if self.workspace_folder.is_empty() {
            return invalid("workspaceFolder may not be empty".to_string());
        }
        if self.exec_command.is_empty() {
            return invalid("execCommand may not be empty".to_string());
        }
        Ok(())
    }

    /// The image the container is created from: the build target when a
    /// build is configured, `image` otherwise.
    pub fn resolved_image(&self) -> &str {
        match &self.build {
            Some(build) if !build.target.is_empty() => &build.target,
            _ => &self.image,
        }
    }
}

/// Derive a stable container name from the project directory.
///
/// The sanitized directory name is followed by the first hex digits of the
/// SHA-256 of the canonical path, so equally named projects do not collide.
pub fn project_name(workspace: &Path) -> String {
    let canonical = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());
    let digest = format!(
        "{:x}",
        Sha256::digest(canonical.to_string_lossy().as_bytes())
    );
    let suffix = &digest[..PROJECT_DIGEST_LEN];

    let base = canonical
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c| c == '-' || c == '.' || c == '_');

    if sanitized.is_empty() {
        format!("{}-{}", PROJECT_NAME_PREFIX, suffix)
    } else {
        format!("{}-{}-{}", PROJECT_NAME_PREFIX, sanitized, suffix)
    }
}
