// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake shell adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ShellAdapter, ShellError, ShellOutput};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded command
#[derive(Debug, Clone)]
pub struct ShellCall {
    pub command: String,
    pub timeout: Duration,
}

type Reply = Result<ShellOutput, ShellError>;

#[derive(Default)]
struct FakeShellState {
    rules: Vec<(String, Reply)>,
    calls: Vec<ShellCall>,
}

/// Fake shell matching commands by substring
///
/// The first rule whose pattern occurs in the command wins; commands with no
/// matching rule succeed with empty output.
#[derive(Clone, Default)]
pub struct FakeShell {
    inner: Arc<Mutex<FakeShellState>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` to every command containing `pattern`
    pub fn on(&self, pattern: &str, reply: Reply) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rules
            .push((pattern.to_string(), reply));
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ShellCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Commands run so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

#[async_trait]
impl ShellAdapter for FakeShell {
    async fn run(&self, command: &str, timeout: Duration) -> Reply {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(ShellCall {
            command: command.to_string(),
            timeout,
        });
        inner
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Ok(ShellOutput::default()))
    }
}
