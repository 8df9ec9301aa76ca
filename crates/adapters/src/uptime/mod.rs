// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uptime monitor push adapters

mod http;
mod noop;

pub use http::{HttpUptime, UptimeConfig};
pub use noop::NoOpUptimeAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeUptimeAdapter;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from uptime pushes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UptimeError {
    #[error("uptime push failed: {0}")]
    Transport(String),
    #[error("uptime push returned {0}")]
    Status(u16),
}

/// Adapter for liveness pushes to an external monitor
#[async_trait]
pub trait UptimeAdapter: Clone + Send + Sync + 'static {
    /// Push for the monitor registered under `key`.
    ///
    /// Returns `Ok(false)` when no monitor is registered for `key`.
    async fn ping(&self, key: &str) -> Result<bool, UptimeError>;
}
