//! Integration tests for the session flows behind each subcommand.

use localpod::cli::{ConfigDiscovery, ConfigSource};
use localpod::container::{ContainerError, ContainerSpec, Environment, Fingerprint, RuntimeClient};
use localpod::executor::RecordingExecutor;
use localpod::executor::recording::{failed, ok};
use localpod::integration::Session;
use tempfile::TempDir;

const NO_SUCH_CONTAINER: &str = "Error: No such container";

fn session(dir: &TempDir, executor: RecordingExecutor, environment: Environment) -> Session<RecordingExecutor> {
    Session::new(
        RuntimeClient::new("docker", executor),
        environment,
        dir.path(),
        ConfigDiscovery::config_path(dir.path(), None),
        true,
    )
}

fn write_config(dir: &TempDir, json: &str) {
    std::fs::write(ConfigDiscovery::config_path(dir.path(), None), json).unwrap();
}

fn inspected(fingerprint: &str) -> String {
    format!(
        r#"[{{"Id": "feed1234", "Name": "/pod", "Config": {{"Env": ["LOCALPOD_CONFIG_FINGERPRINT={}"]}}}}]"#,
        fingerprint
    )
}

#[tokio::test]
async fn test_up_runs_the_whole_flow() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor::new()
        .respond("inspect", failed(1, NO_SUCH_CONTAINER))
        .respond("create", ok("feed1234"))
        .respond("exec", ok(""))
        .respond("exec", ok(""))
        .respond("exec", ok("user created"))
        .respond("exec", failed(7, ""));
    let environment = Environment::from_pairs([("LOCALPOD_IMAGE", "alpine:3.20")]);
    let session = session(&dir, executor, environment);

    let code = session
        .up(&mut tokio::io::sink(), &mut tokio::io::sink())
        .await
        .unwrap();

    assert_eq!(code, 7);
    assert_eq!(
        session.client().executor().subcommands(),
        vec!["inspect", "create", "start", "cp", "exec", "cp", "exec", "exec", "exec", "stop"]
    );

    let config_path = ConfigDiscovery::config_path(dir.path(), None);
    let saved = ContainerSpec::from_reader(std::fs::File::open(&config_path).unwrap()).unwrap();
    assert_eq!(saved.image, "alpine:3.20");

    let calls = session.client().executor().calls();
    let create = &calls[1].args;
    let workspace_mount = format!(
        "source={},target=/workspace,type=bind,consistency=cached",
        dir.path().display()
    );
    assert!(create.contains(&workspace_mount));
    let attach = &calls[8].args;
    assert_eq!(attach.last().map(String::as_str), Some("/start"));
    assert!(attach.contains(&"dev".to_string()));
}

#[tokio::test]
async fn test_up_keeps_container_running_when_asked() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "name": "pod", "image": "alpine", "shutdownAction": "none" }"#);
    let spec = ContainerSpec::from_json_str(
        r#"{ "name": "pod", "image": "alpine", "shutdownAction": "none" }"#,
    )
    .unwrap()
    .finalize(dir.path())
    .unwrap();
    let executor = RecordingExecutor::new()
        .respond("inspect", ok(inspected(Fingerprint::of(&spec).unwrap().as_str())));
    let session = session(&dir, executor, Environment::new());

    let code = session
        .up(&mut tokio::io::sink(), &mut tokio::io::sink())
        .await
        .unwrap();

    assert_eq!(code, 0);
    let subcommands = session.client().executor().subcommands();
    assert_eq!(subcommands.first().map(String::as_str), Some("inspect"));
    assert!(!subcommands.contains(&"create".to_string()));
    assert!(!subcommands.contains(&"stop".to_string()));
}

#[tokio::test]
async fn test_up_reports_failed_provisioning_step() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "name": "pod", "image": "alpine" }"#);
    let executor = RecordingExecutor::new()
        .respond("inspect", failed(1, NO_SUCH_CONTAINER))
        .respond("create", ok("feed1234"))
        .respond("exec", failed(126, "chmod: /tmp/localpod-setup.sh: Operation not permitted"));
    let session = session(&dir, executor, Environment::new());

    let err = session
        .up(&mut tokio::io::sink(), &mut tokio::io::sink())
        .await
        .unwrap_err();

    let chain = format!("{:#}", err);
    assert!(chain.starts_with("could not provision container pod"));
    assert!(chain.contains("could not chmod /tmp/localpod-setup.sh"));
    assert!(chain.contains("Operation not permitted"));
    assert_eq!(session.client().executor().count("cp"), 1);
}

#[tokio::test]
async fn test_invalid_config_stops_before_runtime() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "image": "alpine", "forwardPorts": [3000] }"#);
    let session = session(&dir, RecordingExecutor::new(), Environment::new());

    let err = session
        .up(&mut tokio::io::sink(), &mut tokio::io::sink())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("could not load configuration"));
    assert!(session.client().executor().calls().is_empty());
}

#[tokio::test]
async fn test_stop_and_remove_existing_container() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "name": "pod", "image": "alpine" }"#);
    let executor = RecordingExecutor::new()
        .respond("inspect", ok(inspected("stale")))
        .respond("inspect", ok(inspected("stale")));
    let session = session(&dir, executor, Environment::new());

    session.stop().await.unwrap();
    session.remove().await.unwrap();

    let calls = session.client().executor().calls();
    assert_eq!(calls[1].args, vec!["stop", "pod"]);
    assert_eq!(calls[3].args, vec!["rm", "-f", "feed1234"]);
}

#[tokio::test]
async fn test_stop_without_container_is_a_noop() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "name": "pod", "image": "alpine" }"#);
    let executor = RecordingExecutor::new().respond("inspect", failed(1, NO_SUCH_CONTAINER));
    let session = session(&dir, executor, Environment::new());

    session.stop().await.unwrap();
    assert_eq!(session.client().executor().subcommands(), vec!["inspect"]);
}

#[test]
fn test_show_config_does_not_touch_runtime_or_disk() {
    let dir = TempDir::new().unwrap();
    let session = session(
        &dir,
        RecordingExecutor::new(),
        Environment::from_pairs([("LOCALPOD_ENV_VARS", "EDITOR=vim")]),
    );

    let report = session.show_config().unwrap();

    assert_eq!(report.source, ConfigSource::Environment { saved: false });
    assert!(report.json.contains("\"EDITOR\": \"vim\""));
    assert_eq!(report.fingerprint.as_str().len(), 32);
    assert!(!ConfigDiscovery::config_path(dir.path(), None).exists());
    assert!(session.client().executor().calls().is_empty());
}

#[test]
fn test_show_config_works_without_runtime() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "name": "pod", "image": "alpine" }"#);
    let session = session(&dir, RecordingExecutor::new().unavailable(), Environment::new());

    let report = session.show_config().unwrap();

    assert_eq!(report.source, ConfigSource::File);
    assert!(report.json.contains("\"name\": \"pod\""));
}

#[tokio::test]
async fn test_missing_runtime_fails_up_stop_and_rm() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "name": "pod", "image": "alpine" }"#);
    let session = session(&dir, RecordingExecutor::new().unavailable(), Environment::new());

    let up = session
        .up(&mut tokio::io::sink(), &mut tokio::io::sink())
        .await
        .unwrap_err();
    assert!(matches!(
        up.downcast_ref::<ContainerError>(),
        Some(ContainerError::RuntimeUnavailable(_))
    ));
    assert!(session.stop().await.is_err());
    assert!(session.remove().await.is_err());
    assert!(session.client().executor().calls().is_empty());
}

#[test]
fn test_config_round_trip_preserves_fingerprint() {
    let dir = TempDir::new().unwrap();
    let environment = Environment::from_pairs([
        ("LOCALPOD_IMAGE", "ghcr.io/me/dev:1"),
        ("LOCALPOD_MOUNTS", "type=volume,source=cache,target=/cache"),
        ("LOCALPOD_ENV_VARS", "B=2;A=1"),
    ]);
    let path = ConfigDiscovery::config_path(dir.path(), None);

    let synthesized = ConfigDiscovery::load(&path, dir.path(), &environment, true).unwrap();
    let reloaded = ConfigDiscovery::load(&path, dir.path(), &Environment::new(), true).unwrap();

    assert_eq!(reloaded.source, ConfigSource::File);
    assert_eq!(
        Fingerprint::of(&synthesized.spec).unwrap(),
        Fingerprint::of(&reloaded.spec).unwrap()
    );
}
