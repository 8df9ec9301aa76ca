// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule definitions: which workflow to start, and when

use crate::cron::CronExpr;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ceiling on a single triggered run
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// When a schedule fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerRule {
    /// Fire whenever any of the expressions matches
    Cron { expressions: Vec<CronExpr> },
    /// Fire at every multiple of `every` since the Unix epoch
    Interval {
        #[serde(with = "humantime_serde")]
        every: Duration,
    },
}

impl TriggerRule {
    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TriggerRule::Cron { expressions } => expressions
                .iter()
                .filter_map(|expr| expr.next_after(after))
                .min(),
            TriggerRule::Interval { every } => {
                let period = i64::try_from(every.as_secs()).ok().filter(|p| *p > 0)?;
                let now = after.timestamp();
                let next = (now.div_euclid(period) + 1) * period;
                Utc.timestamp_opt(next, 0).single()
            }
        }
    }
}

/// What happens when a schedule fires while its previous run is still active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Drop the new fire entirely
    #[default]
    Skip,
}

/// A registered schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// Unique schedule id, also used as the workflow id of triggered runs
    pub id: String,
    /// Name of the workflow definition to start
    pub workflow: String,
    pub trigger: TriggerRule,
    #[serde(default)]
    pub overlap: OverlapPolicy,
    #[serde(default)]
    pub memo: String,
    #[serde(with = "humantime_serde", default = "default_execution_timeout")]
    pub execution_timeout: Duration,
}

fn default_execution_timeout() -> Duration {
    DEFAULT_EXECUTION_TIMEOUT
}

impl ScheduleSpec {
    pub fn new(id: impl Into<String>, workflow: impl Into<String>, trigger: TriggerRule) -> Self {
        Self {
            id: id.into(),
            workflow: workflow.into(),
            trigger,
            overlap: OverlapPolicy::Skip,
            memo: String::new(),
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
