// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow instances and their decision history

use crate::activity::ActivityOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle status of a workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Running)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
            WorkflowStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// One recorded decision of a workflow, keyed by sequence number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    ActivityScheduled {
        seq: u32,
        kind: String,
    },
    ActivityCompleted {
        seq: u32,
        kind: String,
        outcome: ActivityOutcome,
    },
    TimerStarted {
        seq: u32,
        fire_at: DateTime<Utc>,
    },
    TimerFired {
        seq: u32,
    },
}

impl HistoryEvent {
    pub fn seq(&self) -> u32 {
        match self {
            HistoryEvent::ActivityScheduled { seq, .. }
            | HistoryEvent::ActivityCompleted { seq, .. }
            | HistoryEvent::TimerStarted { seq, .. }
            | HistoryEvent::TimerFired { seq } => *seq,
        }
    }
}

/// One durable execution of a workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Caller-chosen id; the schedule id for scheduled runs
    pub workflow_id: String,
    /// Unique id of this execution
    pub run_id: String,
    /// Name of the workflow definition
    pub workflow: String,
    pub schedule_id: Option<String>,
    pub input: serde_json::Value,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub execution_timeout: Duration,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub history: Vec<HistoryEvent>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    /// Number of decisions that have fully completed
    pub fn position(&self) -> usize {
        self.history
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    HistoryEvent::ActivityCompleted { .. } | HistoryEvent::TimerFired { .. }
                )
            })
            .count()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock deadline for the whole run
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::from_std(self.execution_timeout).unwrap_or_default()
    }

    /// Drop the decision history once the run is terminal
    pub fn archive(&mut self) {
        self.history.clear();
        self.history.shrink_to_fit();
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
