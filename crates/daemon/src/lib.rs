// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Steward daemon (swd)
//!
//! Owns the durable runtime and scheduler, and answers control requests on a
//! Unix socket.

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use config::{Config, ConfigError};
pub use lifecycle::{startup, DaemonState, LifecycleError};
pub use protocol::{Request, Response, RunSummary, ScheduleSummary};
