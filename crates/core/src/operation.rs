// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log

use crate::activity::ActivityOutcome;
use crate::schedule::ScheduleSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// A new workflow run was started
    WorkflowStarted {
        workflow_id: String,
        run_id: String,
        workflow: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schedule_id: Option<String>,
        #[serde(default)]
        input: serde_json::Value,
        started_at: DateTime<Utc>,
        #[serde(with = "humantime_serde")]
        execution_timeout: Duration,
    },

    /// An activity is about to run
    ActivityScheduled { run_id: String, seq: u32, kind: String },

    /// An activity finished (successfully or not)
    ActivityCompleted {
        run_id: String,
        seq: u32,
        kind: String,
        outcome: ActivityOutcome,
    },

    /// A running activity reported liveness
    ActivityHeartbeat { run_id: String, at: DateTime<Utc> },

    /// A durable timer was armed
    TimerStarted {
        run_id: String,
        seq: u32,
        fire_at: DateTime<Utc>,
    },

    /// A durable timer elapsed
    TimerFired { run_id: String, seq: u32 },

    WorkflowCompleted {
        run_id: String,
        result: String,
        at: DateTime<Utc>,
    },

    WorkflowFailed {
        run_id: String,
        error: String,
        at: DateTime<Utc>,
    },

    WorkflowTimedOut { run_id: String, at: DateTime<Utc> },

    /// A schedule was registered
    ScheduleCreated { spec: ScheduleSpec },

    /// A schedule was removed
    ScheduleDeleted { id: String },
}

impl Operation {
    /// Run this operation belongs to, if any
    pub fn run_id(&self) -> Option<&str> {
        match self {
            Operation::WorkflowStarted { run_id, .. }
            | Operation::ActivityScheduled { run_id, .. }
            | Operation::ActivityCompleted { run_id, .. }
            | Operation::ActivityHeartbeat { run_id, .. }
            | Operation::TimerStarted { run_id, .. }
            | Operation::TimerFired { run_id, .. }
            | Operation::WorkflowCompleted { run_id, .. }
            | Operation::WorkflowFailed { run_id, .. }
            | Operation::WorkflowTimedOut { run_id, .. } => Some(run_id),
            Operation::ScheduleCreated { .. } | Operation::ScheduleDeleted { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
