// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon started from a config file, driven over its socket, talking HTTP to
//! a mock gateway

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use sw_core::WorkflowStatus;
use sw_daemon::client::{ClientError, DaemonClient};
use sw_daemon::{lifecycle, server, Config, LifecycleError, Request, Response};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RUNBOOK: &str = r#"
[schedule.hello]
every = "1h"

[workflow.hello]
kind = "agent-task"
label = "Hello"
agent = "alfred"
timeout = "1m"
task = "Say hello."
detail = true
"#;

fn write_config(dir: &Path, gateway_url: &str) -> Config {
    std::fs::write(dir.join("runbook.toml"), RUNBOOK).unwrap();
    let config = format!(
        r#"
[daemon]
state_dir = "state"
runbook = "runbook.toml"

[gateway]
url = "{gateway_url}"
token = "secret"

[notify]
channel = "C-LOGS"

[spawn]
poll_interval = "50ms"
"#
    );
    let path = dir.join("steward.toml");
    std::fs::write(&path, config).unwrap();
    Config::load(&path).unwrap()
}

async fn mock_gateway() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tools/invoke"))
        .and(body_partial_json(json!({"tool": "sessions_spawn"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"details": {"summary": "Hello from alfred, all systems nominal."}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tools/invoke"))
        .and(body_partial_json(json!({"tool": "message"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    server
}

async fn messages_sent(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|body| body["tool"] == "message")
        .map(|body| body["args"].clone())
        .collect()
}

#[tokio::test]
async fn triggered_run_spawns_and_notifies() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut daemon = lifecycle::startup(&config).await.unwrap();
    assert_eq!(daemon.scheduler.schedules().len(), 1);

    let client = DaemonClient::new(config.socket_path());
    let request = tokio::spawn(async move { client.trigger("hello", Value::Null).await });
    let (stream, _) = daemon.listener.accept().await.unwrap();
    server::handle_connection(&mut daemon, stream).await.unwrap();
    let run_id = request.await.unwrap().unwrap();

    let completion = tokio::time::timeout(Duration::from_secs(10), daemon.completions.recv())
        .await
        .expect("run finishes")
        .unwrap();
    assert_eq!(completion.run_id, run_id);
    assert_eq!(completion.workflow_id, "manual-hello");
    assert_eq!(completion.status, WorkflowStatus::Completed);

    let sent = messages_sent(&server).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["target"], "C-LOGS");
    assert_eq!(
        sent[0]["message"],
        "[WORKFLOW] Hello ✅\nHello from alfred, all systems nominal."
    );

    let Response::Runs { runs } = server::handle_request(&mut daemon, Request::ListRuns) else {
        panic!("expected runs");
    };
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "completed");

    let prefix = run_id[..8].to_string();
    let Response::Run { run } = server::handle_request(&mut daemon, Request::GetRun { run_id: prefix })
    else {
        panic!("expected run");
    };
    assert_eq!(run.run_id, run_id);
    assert_eq!(
        run.detail.as_deref(),
        Some("Hello from alfred, all systems nominal.")
    );
    let missing = server::handle_request(
        &mut daemon,
        Request::GetRun {
            run_id: "not-a-run".to_string(),
        },
    );
    assert!(matches!(missing, Response::Error { .. }));

    daemon.shutdown().await.unwrap();
    assert!(!config.socket_path().exists());
    assert!(!config.lock_path().exists());
}

#[tokio::test]
async fn unknown_workflow_is_rejected_over_the_socket() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let mut daemon = lifecycle::startup(&config).await.unwrap();

    let client = DaemonClient::new(config.socket_path());
    let request = tokio::spawn(async move { client.trigger("nope", Value::Null).await });
    let (stream, _) = daemon.listener.accept().await.unwrap();
    server::handle_connection(&mut daemon, stream).await.unwrap();

    let err = request.await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::Rejected(message) if message.contains("nope")));
    assert!(messages_sent(&server).await.is_empty());
}

#[tokio::test]
async fn second_daemon_is_refused_and_keeps_the_pid_file() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let _first = lifecycle::startup(&config).await.unwrap();
    let pid = std::fs::read_to_string(config.lock_path()).unwrap();

    let err = lifecycle::startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert_eq!(std::fs::read_to_string(config.lock_path()).unwrap(), pid);
    assert!(config.socket_path().exists());
}

#[tokio::test]
async fn restarts_begin_from_a_compacted_wal() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    for _ in 0..3 {
        let mut daemon = lifecycle::startup(&config).await.unwrap();
        assert_eq!(daemon.scheduler.schedules().len(), 1);
        assert!(sw_storage::Wal::replay(&config.wal_path()).unwrap().is_empty());
        daemon.shutdown().await.unwrap();
    }

    assert!(config.snapshot_path().exists());
}

#[tokio::test]
async fn client_without_daemon_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let client = DaemonClient::new(dir.path().join("swd.sock"));

    let err = client.send(&Request::Ping).await.unwrap_err();

    assert!(matches!(err, ClientError::DaemonNotRunning));
}
