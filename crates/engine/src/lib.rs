// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Steward execution engine
//!
//! - Activity executor with start-to-close, heartbeat and retry enforcement
//! - Agent spawn client (submit, poll, terminal-message detection)
//! - Durable runtime: journal, replaying workflow context, recovery
//! - Scheduler with skip-on-overlap
//! - Workflow definitions

pub mod activity;
mod context;
mod error;
mod journal;
mod runtime;
mod scheduler;
pub mod spawn;
pub mod workflows;

#[cfg(test)]
mod test_support;

pub use activity::{Activities, ActivityExecutor, ActivityRunner, ActivitySettings, Heartbeat};
pub use context::WorkflowContext;
pub use error::{RuntimeError, WorkflowError};
pub use journal::{Compaction, Journal, DEFAULT_COMPACT_AFTER};
pub use runtime::{RunCompletion, RunHandle, Runtime, RuntimeDeps, StartRequest};
pub use scheduler::{Scheduler, Trigger};
pub use spawn::{MinLengthDetector, SpawnClient, SpawnConfig, TerminalDetector};
pub use workflows::{Workflow, WorkflowRegistry};
