// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{session, TestEnv};
use std::time::Duration;
use sw_adapters::ShellOutput;
use sw_runbook::WorkflowKind;

const RUN: &str = "run-1";

fn polling(env: &TestEnv) -> PlanePolling {
    let mut def = WorkflowDef::new("plane-polling", WorkflowKind::PlanePolling);
    def.state_file = Some(env.path("plane-polling.json"));
    def.tasks.insert(
        "delegate".into(),
        "PLANE TASK: {task_name}\n\n{task_description}\n\nTask ID: {task_id}".into(),
    );
    def.commands
        .insert("fetch".into(), "plane-check --todo --json".into());
    def.commands.insert(
        "mark".into(),
        "plane-client update-status {task_id} in_progress".into(),
    );
    def.commands.insert(
        "route".into(),
        "delegation-engine delegate {task_name} --json".into(),
    );
    def.timeouts
        .insert("delegate".into(), Duration::from_secs(600));
    def.uptime.insert("success".into(), "plane-poll".into());
    PlanePolling::new(def)
}

fn saved_state(env: &TestEnv) -> Value {
    let text = std::fs::read_to_string(env.path("plane-polling.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

async fn run(env: &TestEnv) -> Result<String, WorkflowError> {
    env.start_run(RUN, "plane-polling");
    polling(env).run(&env.context(RUN), Value::Null).await
}

#[tokio::test]
async fn fetch_failure_notifies_and_raises() {
    let env = TestEnv::new();
    env.shell.on(
        "plane-check",
        Ok(ShellOutput::failure(1, "401 Unauthorized")),
    );

    let err = run(&env).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to fetch tasks from Plane");
    let messages = env.notify.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("[WORKFLOW] plane-polling ❌\nFailed to fetch tasks"));

    let state = saved_state(&env);
    assert_eq!(state["last_poll"], "2026-01-05T00:00:00+00:00");
    assert_eq!(state["last_error"], "2026-01-05T00:00:00+00:00");
    assert!(env.gateway.calls().is_empty());
    assert!(env.uptime.pings().is_empty());
}

#[tokio::test]
async fn garbage_output_is_a_fetch_failure() {
    let env = TestEnv::new();
    env.shell
        .on("plane-check", Ok(ShellOutput::success("<html>502</html>")));

    let err = run(&env).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch tasks from Plane");
}

#[tokio::test]
async fn no_tasks_is_a_quiet_success() {
    let env = TestEnv::new();
    env.shell.on("plane-check", Ok(ShellOutput::success("[]")));

    let result = run(&env).await.unwrap();

    assert_eq!(result, "No tasks");
    assert!(env.notify.messages().is_empty());
    assert_eq!(env.uptime.pings(), vec!["plane-poll".to_string()]);
    let state = saved_state(&env);
    assert_eq!(state["last_poll"], "2026-01-05T00:00:00+00:00");
    assert_eq!(state["known_todo_ids"], json!([]));
    assert_eq!(state["delegated_tasks"], json!([]));
}

#[tokio::test]
async fn new_tasks_are_marked_routed_and_delegated() {
    let env = TestEnv::new();
    sw_storage::StateStore::save(
        &env.path("plane-polling.json"),
        &json!({"last_poll": null, "delegated_tasks": [], "known_todo_ids": ["t-1"], "note": "kept"}),
    )
    .unwrap();
    env.shell.on(
        "plane-check",
        Ok(ShellOutput::success(
            r#"[{"id": "t-1", "name": "Old task"}, {"id": "t-2", "name": "Fix Bob's login", "description": "SSO loop"}]"#,
        )),
    );
    env.shell.on(
        "delegation-engine",
        Ok(ShellOutput::success(r#"{"agent": "coder"}"#)),
    );
    env.gateway.push("sessions_spawn", session("sess-7"));

    let result = run(&env).await.unwrap();

    assert_eq!(result, "1 tasks delegated");
    assert_eq!(
        env.shell.commands(),
        vec![
            "plane-check --todo --json".to_string(),
            "plane-client update-status 't-2' in_progress".to_string(),
            r#"delegation-engine delegate 'Fix Bob'\''s login' --json"#.to_string(),
        ]
    );

    let spawn = &env.gateway.calls_for("sessions_spawn")[0];
    assert_eq!(spawn.args["agentId"], "coder");
    assert_eq!(spawn.args["runTimeoutSeconds"], 600);
    assert_eq!(
        spawn.args["task"],
        "PLANE TASK: Fix Bob's login\n\nSSO loop\n\nTask ID: t-2"
    );
    assert!(env.gateway.calls_for("sessions_history").is_empty());

    let state = saved_state(&env);
    assert_eq!(state["known_todo_ids"], json!(["t-1", "t-2"]));
    assert_eq!(
        state["delegated_tasks"],
        json!([{"task_id": "t-2", "task_name": "Fix Bob's login", "agent": "coder", "session_key": "sess-7"}])
    );
    assert_eq!(state["note"], "kept");

    assert_eq!(
        env.notify.messages(),
        vec!["[WORKFLOW] plane-polling\n1 tasks delegated:\n• Fix Bob's login → coder".to_string()]
    );
    assert_eq!(env.uptime.pings(), vec!["plane-poll".to_string()]);
}

#[tokio::test]
async fn known_tasks_are_not_delegated_again() {
    let env = TestEnv::new();
    sw_storage::StateStore::save(
        &env.path("plane-polling.json"),
        &json!({"known_todo_ids": ["t-1"]}),
    )
    .unwrap();
    env.shell.on(
        "plane-check",
        Ok(ShellOutput::success(r#"[{"id": "t-1", "name": "Old task"}]"#)),
    );

    let result = run(&env).await.unwrap();

    assert_eq!(result, "No new tasks");
    assert!(env.gateway.calls().is_empty());
    assert_eq!(env.uptime.pings(), vec!["plane-poll".to_string()]);
}

#[tokio::test]
async fn unroutable_task_is_retried_next_poll() {
    let env = TestEnv::new();
    env.shell.on(
        "plane-check",
        Ok(ShellOutput::success(r#"[{"id": "t-3", "name": "Mystery"}]"#)),
    );
    env.shell.on(
        "delegation-engine",
        Ok(ShellOutput::failure(1, "no agent matches")),
    );

    let result = run(&env).await.unwrap();

    assert_eq!(result, "0 tasks delegated");
    assert!(env.gateway.calls().is_empty());
    assert!(env.notify.messages().is_empty());
    assert_eq!(saved_state(&env)["known_todo_ids"], json!([]));
}

#[tokio::test]
async fn refused_delegation_leaves_task_unknown() {
    let env = TestEnv::new();
    env.shell.on(
        "plane-check",
        Ok(ShellOutput::success(r#"[{"id": "t-4", "name": "Write docs"}]"#)),
    );
    env.shell.on(
        "delegation-engine",
        Ok(ShellOutput::success(r#"{"agent": "writer"}"#)),
    );
    env.refuse_spawn("agent unavailable");

    let result = run(&env).await.unwrap();

    assert_eq!(result, "0 tasks delegated");
    assert_eq!(saved_state(&env)["known_todo_ids"], json!([]));
}

#[test]
fn quoting_survives_single_quotes() {
    assert_eq!(shell_quote("plain"), "'plain'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
}
