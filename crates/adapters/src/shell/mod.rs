// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command adapters

mod system;

pub use system::SystemShell;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShell, ShellCall};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from running a command
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("failed to start command: {0}")]
    Spawn(String),
    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit code, or -1 when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Adapter for running shell commands
#[async_trait]
pub trait ShellAdapter: Clone + Send + Sync + 'static {
    /// Run `command` through the shell, killing it after `timeout`
    async fn run(&self, command: &str, timeout: Duration) -> Result<ShellOutput, ShellError>;
}
