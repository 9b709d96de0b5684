//! Translation of a [`ContainerSpec`] into runtime CLI arguments.
//!
//! These functions are pure: the same spec, fingerprint and environment
//! always produce the same argument list, in the same order. Validation has
//! already happened by the time a spec reaches this module, so translation
//! cannot fail.

use crate::container::{ContainerSpec, Environment, Fingerprint};
use crate::env::container::{FINGERPRINT_ENV_KEY, HOSTNAME, IDLE_COMMAND, IDLE_ENTRYPOINT};
use std::collections::BTreeMap;

const TTY_FLAGS: [&str; 2] = ["--tty", "--interactive"];

fn env_flags(env: &BTreeMap<String, String>) -> impl Iterator<Item = String> + '_ {
    env.iter()
        .flat_map(|(key, value)| ["--env".to_string(), format!("{}={}", key, value)])
}

fn mount_flags(mounts: &[String]) -> impl Iterator<Item = String> + '_ {
    mounts
        .iter()
        .flat_map(|mount| ["--mount".to_string(), mount.clone()])
}

/// Arguments for `create`, starting with the subcommand.
///
/// Every argument is expanded against `env` after assembly, so placeholders
/// such as `${localWorkspaceFolder}` resolve to the invoking directory.
pub fn create_args(spec: &ContainerSpec, fingerprint: &Fingerprint, env: &Environment) -> Vec<String> {
    let mut args: Vec<String> = vec!["create".to_string()];
    args.extend(TTY_FLAGS.iter().map(|s| s.to_string()));
    args.extend(["--name".to_string(), spec.name.clone()]);
    args.extend(["--hostname".to_string(), HOSTNAME.to_string()]);
    args.extend(["--user".to_string(), spec.container_user.clone()]);

    args.extend(env_flags(&spec.container_env));
    args.extend([
        "--env".to_string(),
        format!("{}={}", FINGERPRINT_ENV_KEY, fingerprint),
    ]);

    args.extend(mount_flags(&spec.mounts));
    if !spec.workspace_mount.is_empty() {
        args.extend(["--mount".to_string(), spec.workspace_mount.clone()]);
    }
    args.extend(["--workdir".to_string(), spec.workspace_folder.clone()]);

    args.extend(spec.run_args.iter().cloned());

    if spec.override_command {
        args.extend(["--entrypoint".to_string(), IDLE_ENTRYPOINT.to_string()]);
    }
    args.push(spec.resolved_image().to_string());
    if spec.override_command {
        args.extend(["-c".to_string(), IDLE_COMMAND.to_string()]);
    }

    args.iter().map(|arg| env.expand(arg)).collect()
}

/// Arguments for the interactive `exec`, starting with the subcommand.
///
/// Only the workdir is expanded, so it names the directory `create` set up.
/// `remoteEnv` values and `execCommand` reach the container verbatim and are
/// resolved there, if at all.
pub fn exec_args(spec: &ContainerSpec, env: &Environment) -> Vec<String> {
    let mut args: Vec<String> = vec!["exec".to_string()];
    args.extend(TTY_FLAGS.iter().map(|s| s.to_string()));
    args.extend(env_flags(&spec.remote_env));
    args.extend(["--user".to_string(), spec.remote_user.clone()]);
    args.extend(["--workdir".to_string(), env.expand(&spec.workspace_folder)]);
    args.push(spec.name.clone());
    args.extend(spec.exec_command.iter().cloned());
    args
}

/// Arguments for `build`, starting with the subcommand. Build-arg values are
/// expanded individually.
pub fn build_args(
    dockerfile: &str,
    context: &str,
    tag: &str,
    build_args: &BTreeMap<String, String>,
    env: &Environment,
) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--pull".to_string(),
        "--tag".to_string(),
        tag.to_string(),
        "--file".to_string(),
        dockerfile.to_string(),
    ];
    for (key, value) in build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, env.expand(value)));
    }
    args.push(context.to_string());
    args
}
