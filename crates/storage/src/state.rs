// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use std::collections::{BTreeMap, HashMap, VecDeque};
use sw_core::{HistoryEvent, Operation, ScheduleSpec, WorkflowInstance, WorkflowStatus};

/// Terminal runs kept for status queries
pub const ARCHIVE_LIMIT: usize = 500;

/// Materialized state built from WAL operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    /// Runs that have not reached a terminal status, keyed by run id
    pub instances: HashMap<String, WorkflowInstance>,
    /// Most recent terminal runs, oldest first, without history
    pub archived: VecDeque<WorkflowInstance>,
    /// Registered schedules, keyed by schedule id
    pub schedules: BTreeMap<String, ScheduleSpec>,
}

impl MaterializedState {
    /// Get a run by ID or unique prefix, live runs first, then the archive
    pub fn get_instance(&self, run_id: &str) -> Option<&WorkflowInstance> {
        if let Some(instance) = self.instances.get(run_id) {
            return Some(instance);
        }

        let mut matches = self
            .instances
            .values()
            .chain(self.archived.iter())
            .filter(|i| i.run_id.starts_with(run_id));

        match (matches.next(), matches.next()) {
            (Some(instance), None) => Some(instance),
            _ => None,
        }
    }

    /// Live instances, oldest first
    pub fn running(&self) -> Vec<&WorkflowInstance> {
        let mut running: Vec<_> = self
            .instances
            .values()
            .filter(|i| i.status == WorkflowStatus::Running)
            .collect();
        running.sort_by_key(|i| i.started_at);
        running
    }

    /// The live run started by a schedule, if one is still active
    pub fn active_for_schedule(&self, schedule_id: &str) -> Option<&WorkflowInstance> {
        self.instances.values().find(|i| {
            i.status == WorkflowStatus::Running && i.schedule_id.as_deref() == Some(schedule_id)
        })
    }

    /// Most recent terminal run for a workflow id
    pub fn last_finished(&self, workflow_id: &str) -> Option<&WorkflowInstance> {
        self.archived
            .iter()
            .rev()
            .find(|i| i.workflow_id == workflow_id)
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::WorkflowStarted {
                workflow_id,
                run_id,
                workflow,
                schedule_id,
                input,
                started_at,
                execution_timeout,
            } => {
                self.instances.insert(
                    run_id.clone(),
                    WorkflowInstance {
                        workflow_id: workflow_id.clone(),
                        run_id: run_id.clone(),
                        workflow: workflow.clone(),
                        schedule_id: schedule_id.clone(),
                        input: input.clone(),
                        status: WorkflowStatus::Running,
                        started_at: *started_at,
                        execution_timeout: *execution_timeout,
                        last_heartbeat: None,
                        history: Vec::new(),
                        result: None,
                        error: None,
                        finished_at: None,
                    },
                );
            }

            Operation::ActivityScheduled { run_id, seq, kind } => {
                self.push_history(
                    run_id,
                    HistoryEvent::ActivityScheduled {
                        seq: *seq,
                        kind: kind.clone(),
                    },
                );
            }

            Operation::ActivityCompleted {
                run_id,
                seq,
                kind,
                outcome,
            } => {
                self.push_history(
                    run_id,
                    HistoryEvent::ActivityCompleted {
                        seq: *seq,
                        kind: kind.clone(),
                        outcome: outcome.clone(),
                    },
                );
            }

            Operation::ActivityHeartbeat { run_id, at } => {
                if let Some(instance) = self.instances.get_mut(run_id) {
                    instance.last_heartbeat = Some(*at);
                }
            }

            Operation::TimerStarted {
                run_id,
                seq,
                fire_at,
            } => {
                self.push_history(
                    run_id,
                    HistoryEvent::TimerStarted {
                        seq: *seq,
                        fire_at: *fire_at,
                    },
                );
            }

            Operation::TimerFired { run_id, seq } => {
                self.push_history(run_id, HistoryEvent::TimerFired { seq: *seq });
            }

            Operation::WorkflowCompleted { run_id, result, at } => {
                self.finish(run_id, WorkflowStatus::Completed, *at, |i| {
                    i.result = Some(result.clone());
                });
            }

            Operation::WorkflowFailed { run_id, error, at } => {
                self.finish(run_id, WorkflowStatus::Failed, *at, |i| {
                    i.error = Some(error.clone());
                });
            }

            Operation::WorkflowTimedOut { run_id, at } => {
                self.finish(run_id, WorkflowStatus::TimedOut, *at, |i| {
                    i.error = Some("execution timeout exceeded".to_string());
                });
            }

            Operation::ScheduleCreated { spec } => {
                self.schedules.insert(spec.id.clone(), spec.clone());
            }

            Operation::ScheduleDeleted { id } => {
                self.schedules.remove(id);
            }
        }
    }

    fn push_history(&mut self, run_id: &str, event: HistoryEvent) {
        if let Some(instance) = self.instances.get_mut(run_id) {
            instance.history.push(event);
        }
    }

    fn finish(
        &mut self,
        run_id: &str,
        status: WorkflowStatus,
        at: chrono::DateTime<chrono::Utc>,
        update: impl FnOnce(&mut WorkflowInstance),
    ) {
        let Some(mut instance) = self.instances.remove(run_id) else {
            return;
        };
        instance.status = status;
        instance.finished_at = Some(at);
        update(&mut instance);
        instance.archive();

        self.archived.push_back(instance);
        while self.archived.len() > ARCHIVE_LIMIT {
            self.archived.pop_front();
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
