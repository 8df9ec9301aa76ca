// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator notification adapters

mod gateway;
mod noop;

pub use gateway::GatewayNotifier;
pub use noop::NoOpNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Adapter for sending chat messages to the operator
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Send `message` to `target` (a channel id)
    async fn send(&self, target: &str, message: &str) -> Result<(), NotifyError>;
}
