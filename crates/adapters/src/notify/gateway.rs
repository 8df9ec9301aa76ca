// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifications delivered through the gateway's `message` tool

use super::{NotifyAdapter, NotifyError};
use crate::gateway::GatewayAdapter;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends chat messages via a gateway adapter
#[derive(Clone)]
pub struct GatewayNotifier<G> {
    gateway: G,
    channel: String,
}

impl<G: GatewayAdapter> GatewayNotifier<G> {
    /// Notifier posting to the `slack` chat integration
    pub fn new(gateway: G) -> Self {
        Self::with_channel(gateway, "slack")
    }

    pub fn with_channel(gateway: G, channel: impl Into<String>) -> Self {
        Self {
            gateway,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl<G: GatewayAdapter> NotifyAdapter for GatewayNotifier<G> {
    async fn send(&self, target: &str, message: &str) -> Result<(), NotifyError> {
        let args = json!({
            "action": "send",
            "channel": self.channel,
            "target": target,
            "message": message,
        });
        let response = self
            .gateway
            .invoke("message", args, SEND_TIMEOUT)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if response.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(response.error_text().to_string()))
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
