// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::gateway::{GatewayAdapter, GatewayError, GatewayResponse};
use crate::shell::{ShellAdapter, ShellError, ShellOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use sw_core::limits::truncate_chars;
use tracing::Instrument;

/// Wrapper that adds tracing to any GatewayAdapter
#[derive(Clone)]
pub struct TracedGateway<G> {
    inner: G,
}

impl<G> TracedGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: GatewayAdapter> GatewayAdapter for TracedGateway<G> {
    async fn invoke(
        &self,
        tool: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<GatewayResponse, GatewayError> {
        let span = tracing::info_span!("gateway.invoke", tool, timeout_s = timeout.as_secs());

        async move {
            // Precondition: a zero timeout can never succeed
            if timeout.is_zero() {
                tracing::error!("timeout must be positive");
                return Err(GatewayError::Transport(
                    "timeout must be a positive duration".to_string(),
                ));
            }

            tracing::debug!("invoking");
            let start = std::time::Instant::now();
            let result = self.inner.invoke(tool, args, timeout).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(response) if response.ok => tracing::debug!(elapsed_ms, "ok"),
                Ok(response) => tracing::info!(
                    elapsed_ms,
                    error = response.error_text(),
                    "tool reported failure"
                ),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "invoke failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any ShellAdapter
#[derive(Clone)]
pub struct TracedShell<S> {
    inner: S,
}

impl<S> TracedShell<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ShellAdapter> ShellAdapter for TracedShell<S> {
    async fn run(&self, command: &str, timeout: Duration) -> Result<ShellOutput, ShellError> {
        let span = tracing::info_span!(
            "shell.run",
            command = %truncate_chars(command, 100),
            timeout_s = timeout.as_secs()
        );

        async move {
            // Precondition: refuse to hand an empty string to the shell
            if command.trim().is_empty() {
                tracing::error!("empty command");
                return Err(ShellError::Spawn("empty command".to_string()));
            }

            tracing::info!("starting");
            let start = std::time::Instant::now();
            let result = self.inner.run(command, timeout).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(output) => tracing::info!(
                    elapsed_ms,
                    exit_code = output.exit_code,
                    stdout_len = output.stdout.len(),
                    "command finished"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "command failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
