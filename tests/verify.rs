mod common;

use std::time::Duration;

use common::ScriptedRunner;
use shipyard::verify;
use shipyard::{CommandOutput, DeployError, DeploymentConfig, RemoteHost, SshSession};

const ROW: &str = r#"{"ID":"9ab","Image":"shop:latest","Names":"shop_app","State":"running","Status":"Up 12 seconds"}"#;

fn config() -> DeploymentConfig {
    DeploymentConfig::new(
        "https://github.com/acme/shop.git",
        RemoteHost::new("198.51.100.4", "ubuntu"),
    )
    .port(5000)
    .health_grace(Duration::ZERO)
}

#[test]
fn missing_container_is_fatal() {
    let config = config();
    let runner = ScriptedRunner::new();
    let session = SshSession::new(&config.remote, &runner);

    let err = verify::verify(&session, &runner, &config).unwrap_err();

    assert!(matches!(err, DeployError::ContainerNotRunning(_)));
    assert_eq!(err.to_string(), "container 'shop_app' is not running");
}

#[test]
fn other_containers_do_not_count() {
    let config = config();
    let runner = ScriptedRunner::new().on_remote(
        "docker ps",
        CommandOutput::ok(r#"{"ID":"1","Names":"redis","State":"running"}"#),
    );
    let session = SshSession::new(&config.remote, &runner);

    let err = verify::verify(&session, &runner, &config).unwrap_err();

    assert!(matches!(err, DeployError::ContainerNotRunning(_)));
}

#[test]
fn failing_http_checks_only_warn() {
    let config = config();
    let runner = ScriptedRunner::new()
        .on_remote("docker ps", CommandOutput::ok(ROW))
        .on_remote("curl", CommandOutput::ok("503"))
        .on_local("curl", CommandOutput::ok("000"));
    let session = SshSession::new(&config.remote, &runner);

    let report = verify::verify(&session, &runner, &config).unwrap();

    assert_eq!(report.container.image, "shop:latest");
    assert_eq!(report.app.url, "http://localhost:5000");
    assert_eq!(report.app.status, Some(503));
    assert_eq!(report.proxy.url, "http://198.51.100.4");
    assert_eq!(report.proxy.status, None);
    assert_eq!(report.warnings().len(), 2);
}

#[test]
fn redirects_count_as_healthy() {
    let config = config();
    let runner = ScriptedRunner::new()
        .on_remote("docker ps", CommandOutput::ok(ROW))
        .on_remote("curl", CommandOutput::ok("302"))
        .on_local("curl", CommandOutput::ok("301"));
    let session = SshSession::new(&config.remote, &runner);

    let report = verify::verify(&session, &runner, &config).unwrap();

    assert!(report.app.healthy());
    assert!(report.proxy.healthy());
    assert!(report.warnings().is_empty());
}

#[test]
fn curl_errors_are_not_fatal() {
    let config = config();
    let runner = ScriptedRunner::new()
        .on_remote("docker ps", CommandOutput::ok(ROW))
        .on_remote("curl", CommandOutput::failed(7, ""))
        .on_local("curl", CommandOutput::failed(28, ""));
    let session = SshSession::new(&config.remote, &runner);

    let report = verify::verify(&session, &runner, &config).unwrap();

    assert!(!report.app.healthy());
    assert!(!report.proxy.healthy());
}

#[test]
fn http_checks_are_bounded() {
    let config = config();
    let runner = ScriptedRunner::new().on_remote("docker ps", CommandOutput::ok(ROW));
    let session = SshSession::new(&config.remote, &runner);

    verify::verify(&session, &runner, &config).unwrap();

    let curls: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.text().contains("curl"))
        .collect();
    assert_eq!(curls.len(), 2);
    assert!(curls.iter().all(|c| c.text().contains("--max-time 10")));
}

#[test]
fn container_filter_is_quoted() {
    let mut config = config();
    config.container = "shop app".into();
    let runner = ScriptedRunner::new().on_remote("docker ps", CommandOutput::ok(ROW));
    let session = SshSession::new(&config.remote, &runner);

    let _ = verify::verify(&session, &runner, &config);

    assert!(runner.ran("docker ps --filter 'name=shop app' --format"));
}
