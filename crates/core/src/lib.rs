// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-core: core types for the steward workflow runtime
//!
//! This crate provides:
//! - Clock and ID abstractions for deterministic tests
//! - Workflow instances, decision history and WAL operations
//! - Activity invocations, execution options and the failure taxonomy
//! - Schedule definitions and a five-field cron parser
//! - Step results and run reports for multi-step workflows

pub mod activity;
pub mod clock;
pub mod cron;
pub mod error;
pub mod id;
pub mod limits;
pub mod operation;
pub mod report;
pub mod schedule;
pub mod workflow;

pub use activity::{
    Activity, ActivityOptions, ActivityOutcome, ActivityResult, ClockReading, Delegation,
    RetryPolicy, ScriptOutput, SpawnOutput,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use cron::{CronError, CronExpr};
pub use error::ActivityError;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use operation::Operation;
pub use report::{RunReport, StepResult};
pub use schedule::{OverlapPolicy, ScheduleSpec, TriggerRule, DEFAULT_EXECUTION_TIMEOUT};
pub use workflow::{HistoryEvent, WorkflowInstance, WorkflowStatus};
