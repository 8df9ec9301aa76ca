// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use sw_runbook::parse_runbook;

const RUNBOOK: &str = r#"
[vars]
vault = "/srv/vault"

[workflow.daily-briefing]
kind = "daily-briefing"
agent = "briefing-butler"

[workflow.daily-briefing.tasks]
daily = "Brief me."
monday = "Brief me about the week."

[workflow.weekly-goals]
kind = "agent-task"
agent = "briefing-butler"
task = "Set goals."

[workflow.plane-polling]
kind = "plane-polling"
state_file = "/tmp/plane.json"
"#;

#[test]
fn registry_builds_every_runbook_workflow() {
    let runbook = parse_runbook(RUNBOOK).unwrap();
    let registry = WorkflowRegistry::from_runbook(&runbook);

    assert_eq!(
        registry.names(),
        vec!["daily-briefing", "plane-polling", "weekly-goals"]
    );
    assert_eq!(registry.get("weekly-goals").unwrap().name(), "weekly-goals");
    assert!(registry.get("vault-maintenance").is_none());
}

#[test]
fn register_replaces_by_name() {
    let mut registry = WorkflowRegistry::new();
    registry.register(build(&WorkflowDef::new("a", WorkflowKind::AgentTask)));
    registry.register(build(&WorkflowDef::new("a", WorkflowKind::PlanePolling)));

    assert_eq!(registry.names(), vec!["a"]);
}

#[test]
fn input_strings_override_vars() {
    let runbook = parse_runbook(RUNBOOK).unwrap();
    let def = runbook.get_workflow("weekly-goals").unwrap();

    let vars = template_vars(def, &json!({"vault": "/tmp/v", "limit": 3, "topic": "rust"}));

    assert_eq!(vars.get("vault").map(String::as_str), Some("/tmp/v"));
    assert_eq!(vars.get("topic").map(String::as_str), Some("rust"));
    assert!(!vars.contains_key("limit"));
}

#[test]
fn missing_task_is_reported_by_name() {
    let def = WorkflowDef::new("briefing", WorkflowKind::DailyBriefing);
    let err = render_task(&def, "daily", &HashMap::new()).unwrap_err();
    assert_eq!(err.to_string(), "briefing: no task named 'daily'");
}
