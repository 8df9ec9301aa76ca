// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent gateway adapters
//!
//! The gateway exposes every capability as a named tool behind a single
//! `POST /tools/invoke` endpoint. Adapters return the decoded envelope; it is
//! up to callers to interpret `ok: false`.

mod http;

pub use http::{GatewayConfig, HttpGateway};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGateway, GatewayCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from gateway calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-success status without a decodable envelope
    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body was not a gateway envelope
    #[error("invalid gateway response: {message}")]
    Decode { message: String, body: String },
}

/// Envelope returned by every tool invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            ok: true,
            result,
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: Value::Null,
            error: Some(error.into()),
        }
    }

    /// `result.details`, where every tool puts its payload
    pub fn details(&self) -> Option<&Value> {
        self.result.get("details")
    }

    /// Error text, or "Unknown error" when the gateway gave none
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}

/// Adapter for invoking gateway tools
#[async_trait]
pub trait GatewayAdapter: Clone + Send + Sync + 'static {
    /// Invoke `tool` with `args`, giving up after `timeout`
    async fn invoke(
        &self,
        tool: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<GatewayResponse, GatewayError>;
}
