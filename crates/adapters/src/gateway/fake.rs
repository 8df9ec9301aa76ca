// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake gateway adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{GatewayAdapter, GatewayError, GatewayResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded gateway invocation
#[derive(Debug, Clone)]
pub struct GatewayCall {
    pub tool: String,
    pub args: Value,
    pub timeout: Duration,
}

type Reply = Result<GatewayResponse, GatewayError>;

#[derive(Default)]
struct FakeGatewayState {
    queued: HashMap<String, VecDeque<Reply>>,
    fallback: HashMap<String, Reply>,
    calls: Vec<GatewayCall>,
}

/// Fake gateway with scripted replies per tool
///
/// Queued replies are consumed in order; once a tool's queue is empty its
/// fallback reply (or `{"ok": true}`) is returned on every call.
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<Mutex<FakeGatewayState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call to `tool`
    pub fn push(&self, tool: &str, reply: Reply) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queued
            .entry(tool.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Reply returned once the queue for `tool` runs dry
    pub fn set_fallback(&self, tool: &str, reply: Reply) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fallback
            .insert(tool.to_string(), reply);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Recorded calls for one tool
    pub fn calls_for(&self, tool: &str) -> Vec<GatewayCall> {
        self.calls().into_iter().filter(|c| c.tool == tool).collect()
    }
}

#[async_trait]
impl GatewayAdapter for FakeGateway {
    async fn invoke(&self, tool: &str, args: Value, timeout: Duration) -> Reply {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(GatewayCall {
            tool: tool.to_string(),
            args,
            timeout,
        });

        if let Some(reply) = inner.queued.get_mut(tool).and_then(|q| q.pop_front()) {
            return reply;
        }
        inner
            .fallback
            .get(tool)
            .cloned()
            .unwrap_or_else(|| Ok(GatewayResponse::ok(Value::Null)))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
