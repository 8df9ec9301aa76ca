// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP gateway client

use super::{GatewayAdapter, GatewayError, GatewayResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use sw_core::limits::{truncate_chars, MAX_ERROR_CHARS};

/// Where the gateway lives and how to authenticate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub url: String,
    #[serde(default, skip_serializing)]
    pub token: String,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    fn invoke_url(&self) -> String {
        format!("{}/tools/invoke", self.url.trim_end_matches('/'))
    }
}

/// Gateway adapter speaking JSON over HTTP
#[derive(Clone)]
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn bearer(&self) -> Result<HeaderValue, GatewayError> {
        HeaderValue::from_str(&format!("Bearer {}", self.config.token))
            .map_err(|e| GatewayError::Transport(format!("invalid token: {e}")))
    }
}

#[async_trait]
impl GatewayAdapter for HttpGateway {
    async fn invoke(
        &self,
        tool: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .client
            .post(self.config.invoke_url())
            .header(AUTHORIZATION, self.bearer()?)
            .timeout(timeout)
            .json(&json!({ "tool": tool, "args": args }))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // Tool failures come back as an envelope even on error statuses
        match serde_json::from_str::<GatewayResponse>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_CHARS),
            }),
            Err(e) => Err(GatewayError::Decode {
                message: e.to_string(),
                body: truncate_chars(&body, MAX_ERROR_CHARS),
            }),
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
