// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;
use sw_core::{ActivityError, TriggerRule};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 5, minute, 0).unwrap()
}

fn started(run_id: &str, schedule_id: Option<&str>) -> Operation {
    Operation::WorkflowStarted {
        workflow_id: schedule_id.unwrap_or("manual").to_string(),
        run_id: run_id.to_string(),
        workflow: "daily-briefing".to_string(),
        schedule_id: schedule_id.map(String::from),
        input: serde_json::Value::Null,
        started_at: at(0),
        execution_timeout: Duration::from_secs(7200),
    }
}

#[test]
fn apply_workflow_started() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", Some("daily-briefing")));

    let instance = &state.instances["run-1"];
    assert_eq!(instance.status, WorkflowStatus::Running);
    assert_eq!(instance.workflow_id, "daily-briefing");
    assert!(instance.history.is_empty());
}

#[test]
fn activity_events_build_history() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", None));
    state.apply(&Operation::ActivityScheduled {
        run_id: "run-1".to_string(),
        seq: 0,
        kind: "notify".to_string(),
    });
    state.apply(&Operation::ActivityCompleted {
        run_id: "run-1".to_string(),
        seq: 0,
        kind: "notify".to_string(),
        outcome: Ok(serde_json::Value::Null),
    });
    state.apply(&Operation::ActivityScheduled {
        run_id: "run-1".to_string(),
        seq: 1,
        kind: "spawn_agent".to_string(),
    });

    let instance = &state.instances["run-1"];
    assert_eq!(instance.history.len(), 3);
    assert_eq!(instance.position(), 1);
}

#[test]
fn events_for_unknown_run_are_ignored() {
    let mut state = MaterializedState::default();
    state.apply(&Operation::TimerFired {
        run_id: "ghost".to_string(),
        seq: 0,
    });
    state.apply(&Operation::WorkflowCompleted {
        run_id: "ghost".to_string(),
        result: "done".to_string(),
        at: at(1),
    });

    assert!(state.instances.is_empty());
    assert!(state.archived.is_empty());
}

#[test]
fn heartbeat_updates_last_seen() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", None));
    state.apply(&Operation::ActivityHeartbeat {
        run_id: "run-1".to_string(),
        at: at(3),
    });

    assert_eq!(state.instances["run-1"].last_heartbeat, Some(at(3)));
}

#[test]
fn completion_moves_run_to_archive() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", Some("daily-briefing")));
    state.apply(&Operation::ActivityScheduled {
        run_id: "run-1".to_string(),
        seq: 0,
        kind: "notify".to_string(),
    });
    state.apply(&Operation::WorkflowCompleted {
        run_id: "run-1".to_string(),
        result: "Daily Briefing delivered".to_string(),
        at: at(4),
    });

    assert!(state.instances.is_empty());
    let finished = state.last_finished("daily-briefing").unwrap();
    assert_eq!(finished.status, WorkflowStatus::Completed);
    assert_eq!(finished.result.as_deref(), Some("Daily Briefing delivered"));
    assert_eq!(finished.finished_at, Some(at(4)));
    assert!(finished.history.is_empty());
}

#[test]
fn failure_and_timeout_record_error() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", None));
    state.apply(&started("run-2", None));
    state.apply(&Operation::WorkflowFailed {
        run_id: "run-1".to_string(),
        error: "2 steps failed".to_string(),
        at: at(5),
    });
    state.apply(&Operation::WorkflowTimedOut {
        run_id: "run-2".to_string(),
        at: at(6),
    });

    assert_eq!(state.archived.len(), 2);
    assert_eq!(state.archived[0].status, WorkflowStatus::Failed);
    assert_eq!(state.archived[0].error.as_deref(), Some("2 steps failed"));
    assert_eq!(state.archived[1].status, WorkflowStatus::TimedOut);
}

#[test]
fn archive_is_bounded() {
    let mut state = MaterializedState::default();
    for i in 0..ARCHIVE_LIMIT + 10 {
        let run_id = format!("run-{i}");
        state.apply(&started(&run_id, None));
        state.apply(&Operation::WorkflowCompleted {
            run_id,
            result: String::new(),
            at: at(0),
        });
    }

    assert_eq!(state.archived.len(), ARCHIVE_LIMIT);
    assert_eq!(state.archived[0].run_id, "run-10");
}

#[test]
fn active_for_schedule_tracks_running_runs() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", Some("plane-polling")));
    assert_eq!(
        state.active_for_schedule("plane-polling").map(|i| i.run_id.as_str()),
        Some("run-1")
    );
    assert!(state.active_for_schedule("daily-briefing").is_none());

    state.apply(&Operation::WorkflowFailed {
        run_id: "run-1".to_string(),
        error: "Failed: gateway down".to_string(),
        at: at(2),
    });
    assert!(state.active_for_schedule("plane-polling").is_none());
}

#[test]
fn get_instance_by_prefix() {
    let mut state = MaterializedState::default();
    state.apply(&started("abc123", None));
    state.apply(&started("abd456", None));

    assert!(state.get_instance("abc").is_some());
    assert!(state.get_instance("ab").is_none());
    assert!(state.get_instance("zzz").is_none());
    assert!(state.get_instance("abd456").is_some());
}

#[test]
fn get_instance_finds_archived_runs() {
    let mut state = MaterializedState::default();
    state.apply(&started("abc123", None));
    state.apply(&Operation::WorkflowCompleted {
        run_id: "abc123".to_string(),
        result: "Delivered".to_string(),
        at: at(1),
    });
    state.apply(&started("abd456", None));

    let archived = state.get_instance("abc").unwrap();
    assert_eq!(archived.status, WorkflowStatus::Completed);
    assert!(state.get_instance("ab").is_none());
}

#[test]
fn running_is_sorted_by_start() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-b", None));
    state.apply(&Operation::WorkflowStarted {
        workflow_id: "early".to_string(),
        run_id: "run-a".to_string(),
        workflow: "weekly-goals".to_string(),
        schedule_id: None,
        input: serde_json::Value::Null,
        started_at: Utc.with_ymd_and_hms(2026, 1, 5, 4, 0, 0).unwrap(),
        execution_timeout: Duration::from_secs(60),
    });

    let ids: Vec<_> = state.running().iter().map(|i| i.run_id.as_str()).collect();
    assert_eq!(ids, vec!["run-a", "run-b"]);
}

#[test]
fn schedules_created_and_deleted() {
    let mut state = MaterializedState::default();
    let spec = ScheduleSpec::new(
        "plane-polling",
        "plane-polling",
        TriggerRule::Interval {
            every: Duration::from_secs(900),
        },
    );
    state.apply(&Operation::ScheduleCreated { spec: spec.clone() });
    assert_eq!(state.schedules.get("plane-polling"), Some(&spec));

    state.apply(&Operation::ScheduleDeleted {
        id: "plane-polling".to_string(),
    });
    assert!(state.schedules.is_empty());
}

#[test]
fn failed_outcome_is_recorded_verbatim() {
    let mut state = MaterializedState::default();
    state.apply(&started("run-1", None));
    let outcome = Err(ActivityError::rejected("Spawn failed: no agent"));
    state.apply(&Operation::ActivityCompleted {
        run_id: "run-1".to_string(),
        seq: 0,
        kind: "spawn_agent".to_string(),
        outcome: outcome.clone(),
    });

    assert_eq!(
        state.instances["run-1"].history[0],
        HistoryEvent::ActivityCompleted {
            seq: 0,
            kind: "spawn_agent".to_string(),
            outcome,
        }
    );
}
