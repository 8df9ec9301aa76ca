// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule registry and trigger evaluation
//!
//! Registration is journaled, so the registered set survives restarts. Fire
//! times are kept in memory and recomputed from "now" on every sync; missed
//! fires are never caught up.

use crate::journal::Journal;
use crate::runtime::StartRequest;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use sw_core::{Operation, ScheduleSpec};
use sw_storage::WalError;

/// A schedule that is due to start a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub schedule_id: String,
    pub workflow: String,
    pub fire_at: DateTime<Utc>,
    pub execution_timeout: Duration,
}

impl Trigger {
    /// Scheduled runs use the schedule id as their workflow id
    pub fn into_request(self) -> StartRequest {
        StartRequest {
            workflow: self.workflow,
            workflow_id: self.schedule_id.clone(),
            input: Value::Null,
            schedule_id: Some(self.schedule_id),
            execution_timeout: self.execution_timeout,
        }
    }
}

/// Keeps registered schedules and decides when they fire
pub struct Scheduler {
    journal: Journal,
    next_fire: BTreeMap<String, DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            next_fire: BTreeMap::new(),
        }
    }

    /// Make the registered set exactly `desired`
    ///
    /// Every desired schedule is deleted (if present) and created fresh;
    /// registered ids that are no longer desired are deleted.
    pub fn sync(&mut self, desired: &[ScheduleSpec]) -> Result<(), WalError> {
        let existing: Vec<String> = self
            .journal
            .read(|state| state.schedules.keys().cloned().collect());
        let wanted: HashSet<&str> = desired.iter().map(|s| s.id.as_str()).collect();

        for spec in desired {
            self.register(spec.clone())?;
        }
        for id in existing.iter().filter(|id| !wanted.contains(id.as_str())) {
            tracing::info!(schedule_id = %id, "removing schedule no longer in runbook");
            self.delete(id)?;
        }
        Ok(())
    }

    /// Register `spec`, replacing any schedule with the same id
    pub fn register(&mut self, spec: ScheduleSpec) -> Result<(), WalError> {
        let exists = self
            .journal
            .read(|state| state.schedules.contains_key(&spec.id));
        if exists {
            self.journal.persist(Operation::ScheduleDeleted {
                id: spec.id.clone(),
            })?;
        }

        let next = spec.trigger.next_after(self.journal.now());
        tracing::info!(
            schedule_id = %spec.id,
            workflow = %spec.workflow,
            next_fire = ?next,
            "schedule registered"
        );
        match next {
            Some(at) => {
                self.next_fire.insert(spec.id.clone(), at);
            }
            None => {
                tracing::warn!(schedule_id = %spec.id, "schedule never fires");
                self.next_fire.remove(&spec.id);
            }
        }
        self.journal.persist(Operation::ScheduleCreated { spec })
    }

    /// Remove a schedule; returns whether it was registered
    pub fn delete(&mut self, id: &str) -> Result<bool, WalError> {
        self.next_fire.remove(id);
        if !self.journal.read(|state| state.schedules.contains_key(id)) {
            return Ok(false);
        }
        self.journal.persist(Operation::ScheduleDeleted { id: id.to_string() })?;
        Ok(true)
    }

    /// Registered schedules, by id
    pub fn schedules(&self) -> Vec<ScheduleSpec> {
        self.journal
            .read(|state| state.schedules.values().cloned().collect())
    }

    pub fn next_fire(&self, id: &str) -> Option<DateTime<Utc>> {
        self.next_fire.get(id).copied()
    }

    /// Earliest upcoming fire across all schedules
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.next_fire.values().min().copied()
    }

    /// Triggers due at `now`
    ///
    /// A schedule whose previous run is still active is skipped for this
    /// fire. Either way its next fire time moves past `now`.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<Trigger> {
        let ready: Vec<(String, DateTime<Utc>)> = self
            .next_fire
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (id.clone(), *at))
            .collect();

        let mut triggers = Vec::new();
        for (id, fire_at) in ready {
            let (spec, active) = self.journal.read(|state| {
                (
                    state.schedules.get(&id).cloned(),
                    state.active_for_schedule(&id).map(|i| i.run_id.clone()),
                )
            });
            let Some(spec) = spec else {
                self.next_fire.remove(&id);
                continue;
            };

            match spec.trigger.next_after(now) {
                Some(next) => {
                    self.next_fire.insert(id.clone(), next);
                }
                None => {
                    self.next_fire.remove(&id);
                }
            }

            if let Some(run_id) = active {
                tracing::info!(
                    schedule_id = %id,
                    active_run = %run_id,
                    "previous run still active, skipping"
                );
                continue;
            }

            triggers.push(Trigger {
                schedule_id: id,
                workflow: spec.workflow,
                fire_at,
                execution_timeout: spec.execution_timeout,
            });
        }
        triggers
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
