// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op uptime adapter for deployments without a monitor.

use super::{UptimeAdapter, UptimeError};
use async_trait::async_trait;

/// Uptime adapter that never pings anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpUptimeAdapter;

#[async_trait]
impl UptimeAdapter for NoOpUptimeAdapter {
    async fn ping(&self, _key: &str) -> Result<bool, UptimeError> {
        Ok(false)
    }
}
