// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runbook shipped at the repository root stays loadable

#![allow(clippy::unwrap_used, clippy::panic)]

use std::path::Path;
use std::time::Duration;
use sw_core::TriggerRule;
use sw_runbook::{load_runbook, WorkflowKind};

fn shipped() -> sw_runbook::Runbook {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../runbook.toml");
    load_runbook(&path).unwrap()
}

#[test]
fn every_schedule_targets_a_defined_workflow() {
    let runbook = shipped();

    assert_eq!(runbook.schedules.len(), 12);
    for spec in runbook.schedule_specs() {
        assert!(
            runbook.get_workflow(&spec.workflow).is_some(),
            "{} has no workflow",
            spec.id
        );
    }
}

#[test]
fn polling_schedules_run_every_fifteen_minutes() {
    let runbook = shipped();

    for id in ["plane-polling", "backlog-handler"] {
        assert_eq!(
            runbook.get_schedule(id).unwrap().trigger,
            TriggerRule::Interval {
                every: Duration::from_secs(900)
            }
        );
    }
}

#[test]
fn content_pipelines_use_their_dedicated_kinds() {
    let runbook = shipped();

    let kind = |name: &str| runbook.get_workflow(name).unwrap().kind;
    assert_eq!(kind("daily-briefing"), WorkflowKind::DailyBriefing);
    assert_eq!(kind("vault-maintenance"), WorkflowKind::VaultMaintenance);
    assert_eq!(kind("plane-polling"), WorkflowKind::PlanePolling);
    assert_eq!(kind("weekly-roundup"), WorkflowKind::AgentTask);

    let roundup = runbook.get_workflow("weekly-roundup").unwrap();
    assert_eq!(roundup.timeout, Duration::from_secs(900));
    let backlog = runbook.get_workflow("backlog-handler").unwrap();
    assert!(!backlog.raise_on_failure);
}
