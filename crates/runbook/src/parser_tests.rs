// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SAMPLE_RUNBOOK: &str = r#"
[vars]
vault = "/srv/vault"

[schedule.integration-health]
cron = "0 3 * * *"
memo = "Integration health check"

[schedule.seo-enrichment]
cron = ["0 7 * * *", "0 11,15,19 * * *"]

[schedule.polling]
workflow = "plane-polling"
every = "15m"
execution_timeout = "10m"

[workflow.integration-health]
kind = "agent-task"
label = "Integration Health"
agent = "ops-guardian"
timeout = "5m"
task = "Check every integration under {vault}."
detail = true
ping = "always"
uptime = { success = "int-health" }

[workflow.seo-enrichment]
kind = "agent-task"
agent = "content-lumberjack"
timeout = "10m"
task = "Enrich one article."

[workflow.plane-polling]
kind = "plane-polling"
state_file = "/tmp/plane-polling.json"
uptime = { success = "plane-poll" }

[workflow.plane-polling.tasks]
delegate = "PLANE TASK: {task_name}\n\n{task_description}\n\nTask ID: {task_id}"

[workflow.plane-polling.commands]
fetch = "plane-check --todo --json"
mark = "plane-client update-status {task_id} in_progress"
route = "delegation-engine delegate {task_name} --json"

[workflow.plane-polling.timeouts]
fetch = "30s"
"#;

#[test]
fn parse_workflows() {
    let runbook = parse_runbook(SAMPLE_RUNBOOK).unwrap();
    assert_eq!(runbook.workflows.len(), 3);

    let health = runbook.get_workflow("integration-health").unwrap();
    assert_eq!(health.kind, WorkflowKind::AgentTask);
    assert_eq!(health.label, "Integration Health");
    assert_eq!(health.agent.as_deref(), Some("ops-guardian"));
    assert_eq!(health.timeout, Duration::from_secs(300));
    assert_eq!(health.ping, PingPolicy::Always);
    assert!(health.detail);
    assert_eq!(health.uptime_key("success"), Some("int-health"));
    assert_eq!(health.vars.get("vault").map(String::as_str), Some("/srv/vault"));
}

#[test]
fn parse_workflow_defaults() {
    let runbook = parse_runbook(SAMPLE_RUNBOOK).unwrap();
    let seo = runbook.get_workflow("seo-enrichment").unwrap();

    assert_eq!(seo.label, "seo-enrichment");
    assert_eq!(seo.ping, PingPolicy::Success);
    assert!(!seo.detail);
    assert!(seo.raise_on_failure);
    assert!(seo.quiet_markers.is_empty());
}

#[test]
fn parse_plane_polling_commands() {
    let runbook = parse_runbook(SAMPLE_RUNBOOK).unwrap();
    let plane = runbook.get_workflow("plane-polling").unwrap();

    assert_eq!(plane.get_command("fetch"), Some("plane-check --todo --json"));
    assert_eq!(plane.timeout_for("fetch"), Duration::from_secs(30));
    assert_eq!(
        plane.state_file.as_deref(),
        Some(Path::new("/tmp/plane-polling.json"))
    );
    assert!(plane.get_task("delegate").unwrap().starts_with("PLANE TASK"));
}

#[test]
fn parse_schedules() {
    let runbook = parse_runbook(SAMPLE_RUNBOOK).unwrap();
    assert_eq!(runbook.schedules.len(), 3);

    let health = runbook.get_schedule("integration-health").unwrap();
    assert_eq!(health.workflow, "integration-health");
    assert_eq!(health.memo, "Integration health check");
    assert_eq!(health.execution_timeout, DEFAULT_EXECUTION_TIMEOUT);

    let seo = runbook.get_schedule("seo-enrichment").unwrap();
    match &seo.trigger {
        TriggerRule::Cron { expressions } => assert_eq!(expressions.len(), 2),
        other => panic!("expected cron trigger, got {other:?}"),
    }

    let polling = runbook.get_schedule("polling").unwrap();
    assert_eq!(polling.workflow, "plane-polling");
    assert_eq!(
        polling.trigger,
        TriggerRule::Interval {
            every: Duration::from_secs(900)
        }
    );
    assert_eq!(polling.execution_timeout, Duration::from_secs(600));
}

#[test]
fn schedule_specs_are_ordered_by_id() {
    let runbook = parse_runbook(SAMPLE_RUNBOOK).unwrap();
    let ids: Vec<_> = runbook
        .schedule_specs()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["integration-health", "polling", "seo-enrichment"]);
}

#[test]
fn env_defaults_expand_at_load() {
    std::env::remove_var("RUNBOOK_TEST_SCRIPTS");
    let runbook = parse_runbook(
        r#"
[workflow.kb]
kind = "agent-task"
agent = "kb-curator"
task = "Run ${RUNBOOK_TEST_SCRIPTS:-/opt/scripts}/sync for {vault}"
"#,
    )
    .unwrap();

    assert_eq!(
        runbook.get_workflow("kb").unwrap().task.as_deref(),
        Some("Run /opt/scripts/sync for {vault}")
    );
}

#[test]
fn error_unknown_workflow_in_schedule() {
    let err = parse_runbook(
        r#"
[schedule.nightly]
cron = "0 0 * * *"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown workflow 'nightly'"), "{err}");
}

#[test]
fn error_schedule_without_trigger() {
    let err = parse_runbook(
        r#"
[workflow.x]
kind = "agent-task"
agent = "alfred"
task = "t"

[schedule.x]
memo = "no trigger"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::MissingField(f) if f == "schedule.x.cron"));
}

#[test]
fn error_cron_and_every() {
    let err = parse_runbook(
        r#"
[workflow.x]
kind = "agent-task"
agent = "alfred"
task = "t"

[schedule.x]
cron = "* * * * *"
every = "1m"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidFormat(_)));
}

#[test]
fn error_bad_cron() {
    let err = parse_runbook(
        r#"
[workflow.x]
kind = "agent-task"
agent = "alfred"
task = "t"

[schedule.x]
cron = "0 25 * * *"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::Cron { .. }));
}

#[test]
fn error_zero_interval() {
    let err = parse_runbook(
        r#"
[workflow.x]
kind = "agent-task"
agent = "alfred"
task = "t"

[schedule.x]
every = "0s"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("must be positive"), "{err}");
}

#[test]
fn error_agent_task_without_task() {
    let err = parse_runbook(
        r#"
[workflow.weekly-goals]
kind = "agent-task"
agent = "briefing-butler"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::MissingField(f) if f == "workflow.weekly-goals.task"));
}

#[test]
fn error_daily_briefing_without_monday_task() {
    let err = parse_runbook(
        r#"
[workflow.daily-briefing]
kind = "daily-briefing"
agent = "briefing-butler"
tasks = { daily = "Daily briefing" }
"#,
    )
    .unwrap_err();
    assert!(
        matches!(err, ParseError::MissingField(ref f) if f == "workflow.daily-briefing.tasks.monday"),
        "{err}"
    );
}

#[test]
fn error_unknown_workflow_field() {
    let err = parse_runbook(
        r#"
[workflow.x]
kind = "agent-task"
agent = "alfred"
task = "t"
retries = 3
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidFormat(_)));
}

#[test]
fn error_unknown_kind() {
    let err = parse_runbook(
        r#"
[workflow.x]
kind = "email-processor"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidFormat(_)));
}

#[test]
fn load_runbook_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runbook.toml");
    std::fs::write(&path, SAMPLE_RUNBOOK).unwrap();

    let runbook = load_runbook(&path).unwrap();
    assert_eq!(runbook.schedules.len(), 3);

    let err = load_runbook(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ParseError::Io { .. }));
}
