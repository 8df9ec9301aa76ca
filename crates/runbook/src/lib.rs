// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Runbook parsing and definition

mod parser;
mod template;
mod workflow;

pub use parser::{load_runbook, parse_runbook, ParseError, Runbook};
pub use template::{expand_env, interpolate};
pub use workflow::{PingPolicy, WorkflowDef, WorkflowKind, DEFAULT_AGENT_TIMEOUT};
