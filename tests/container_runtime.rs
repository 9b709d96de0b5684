//! Integration tests against a real container runtime.
//!
//! These tests drive `docker` (or `podman`) end-to-end without attaching an
//! interactive session. They are skipped if no runtime is available or
//! SKIP_CONTAINER_TESTS=1.

use localpod::container::{ContainerSpec, Environment, Outcome, Provisioner, Reconciler, RuntimeClient};
use localpod::executor::HostExecutor;
use serial_test::serial;
use std::path::Path;
use test_tag::tag;

const TEST_CONTAINER: &str = "localpod-integration-test";

/// Pick the runtime to test against, if any.
fn container_runtime() -> Option<&'static str> {
    if let Ok(value) = std::env::var("SKIP_CONTAINER_TESTS") {
        if value == "1" || value.eq_ignore_ascii_case("true") {
            return None;
        }
    }

    ["docker", "podman"].into_iter().find(|runtime| {
        std::process::Command::new(runtime)
            .arg("info")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

fn spec(workspace: &Path) -> ContainerSpec {
    ContainerSpec {
        name: TEST_CONTAINER.to_string(),
        image: "docker.io/library/alpine:3.20".to_string(),
        ..Default::default()
    }
    .finalize(workspace)
    .unwrap()
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_reconcile_reuse_and_drift() {
    let Some(runtime) = container_runtime() else {
        eprintln!("Skipping container tests (Docker/Podman not available or SKIP_CONTAINER_TESTS=1)");
        return;
    };

    let workspace = tempfile::TempDir::new().unwrap();
    let env = Environment::new().with("localWorkspaceFolder", workspace.path().display().to_string());
    let client = RuntimeClient::new(runtime, HostExecutor::new());
    client.remove(TEST_CONTAINER).await.unwrap();

    let reconciler = Reconciler::new(&client, &env);
    let mut spec = spec(workspace.path());

    let first = reconciler
        .reconcile(&spec, &mut tokio::io::sink(), &mut tokio::io::stderr())
        .await
        .unwrap();
    assert_eq!(first.outcome, Outcome::Created);
    first.container.start().await.unwrap();

    let again = reconciler
        .reconcile(&spec, &mut tokio::io::sink(), &mut tokio::io::stderr())
        .await
        .unwrap();
    assert_eq!(again.outcome, Outcome::Reused);
    assert_eq!(again.container.id(), first.container.id());

    spec.container_env
        .insert("LOCALPOD_TEST".to_string(), "changed".to_string());
    let drifted = reconciler
        .reconcile(&spec, &mut tokio::io::sink(), &mut tokio::io::stderr())
        .await
        .unwrap();
    assert_eq!(drifted.outcome, Outcome::Recreated);
    assert_ne!(drifted.container.id(), first.container.id());

    drifted.container.remove().await.unwrap();
    assert!(client.inspect(TEST_CONTAINER).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_provision_creates_remote_user() {
    let Some(runtime) = container_runtime() else {
        eprintln!("Skipping container tests");
        return;
    };

    let workspace = tempfile::TempDir::new().unwrap();
    let env = Environment::new().with("localWorkspaceFolder", workspace.path().display().to_string());
    let client = RuntimeClient::new(runtime, HostExecutor::new());
    client.remove(TEST_CONTAINER).await.unwrap();

    let spec = spec(workspace.path());
    let reconciled = Reconciler::new(&client, &env)
        .reconcile(&spec, &mut tokio::io::sink(), &mut tokio::io::stderr())
        .await
        .unwrap();
    let container = reconciled.container;
    container.start().await.unwrap();

    Provisioner::for_current_user(&spec.remote_user)
        .provision(&container)
        .await
        .unwrap();

    let sudoers = client
        .exec_captured(TEST_CONTAINER, "root", "/", &["cat", "/etc/sudoers.d/dev"])
        .await
        .unwrap();
    assert_eq!(sudoers.stdout.trim(), "dev ALL=(ALL) NOPASSWD:ALL");
    let start = client
        .exec_captured(TEST_CONTAINER, "root", "/", &["test", "-x", "/start"])
        .await;
    assert!(start.is_ok());

    container.remove().await.unwrap();
}
