// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O

pub mod gateway;
pub mod notify;
pub mod shell;
pub mod traced;
pub mod uptime;

pub use gateway::{GatewayAdapter, GatewayConfig, GatewayError, GatewayResponse, HttpGateway};
pub use notify::{GatewayNotifier, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
pub use shell::{ShellAdapter, ShellError, ShellOutput, SystemShell};
pub use traced::{TracedGateway, TracedShell};
pub use uptime::{HttpUptime, NoOpUptimeAdapter, UptimeAdapter, UptimeConfig, UptimeError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use gateway::{FakeGateway, GatewayCall};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeShell, ShellCall};
#[cfg(any(test, feature = "test-support"))]
pub use uptime::FakeUptimeAdapter;
