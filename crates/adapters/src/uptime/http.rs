// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP push pinger (Uptime Kuma style `GET /api/push/<token>`)

use super::{UptimeAdapter, UptimeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Push monitors by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UptimeConfig {
    /// Prefix for push paths that are not absolute URLs
    #[serde(default)]
    pub base_url: String,
    /// Key to push path (or full URL)
    #[serde(default)]
    pub pushes: BTreeMap<String, String>,
}

impl UptimeConfig {
    /// Full URL for a key, if one is registered
    pub fn push_url(&self, key: &str) -> Option<String> {
        let push = self.pushes.get(key)?;
        if push.starts_with("http://") || push.starts_with("https://") {
            return Some(push.clone());
        }
        Some(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            push.trim_start_matches('/')
        ))
    }
}

/// Uptime adapter issuing HTTP GETs
#[derive(Clone)]
pub struct HttpUptime {
    config: UptimeConfig,
    client: reqwest::Client,
}

impl HttpUptime {
    pub fn new(config: UptimeConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl UptimeAdapter for HttpUptime {
    async fn ping(&self, key: &str) -> Result<bool, UptimeError> {
        let Some(url) = self.config.push_url(key) else {
            return Ok(false);
        };

        let response = self
            .client
            .get(url)
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| UptimeError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            Err(UptimeError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
