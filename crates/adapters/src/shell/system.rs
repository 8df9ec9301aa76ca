// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sh -c` shell adapter

use super::{ShellAdapter, ShellError, ShellOutput};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs commands with `sh -c`
#[derive(Clone, Debug, Default)]
pub struct SystemShell {
    cwd: Option<PathBuf>,
}

impl SystemShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands from `cwd` instead of the daemon's directory
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }
}

#[async_trait]
impl ShellAdapter for SystemShell {
    async fn run(&self, command: &str, timeout: Duration) -> Result<ShellOutput, ShellError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| ShellError::Spawn(e.to_string()))?;

        // Dropping the future on timeout kills the child
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ShellError::Timeout(timeout))?
            .map_err(|e| ShellError::Spawn(e.to_string()))?;

        Ok(ShellOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
