// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent spawn-and-poll protocol
//!
//! The gateway has no completion callback. A spawn either answers inline or
//! hands back a session key, and the session's history is then polled until
//! a substantive assistant message shows up, the session disappears (cleanup
//! after completion), or the deadline passes.

use crate::activity::Heartbeat;
use serde_json::{json, Value};
use std::time::Duration;
use sw_adapters::{GatewayAdapter, GatewayError};
use sw_core::limits::{truncate_chars, MAX_OUTPUT_CHARS};
use sw_core::{ActivityError, Delegation, SpawnOutput};
use tokio::time::Instant;

/// Session key reported when the gateway answered inline
pub const INLINE_SESSION_KEY: &str = "completed-inline";

/// Output reported when the session was already cleaned up
pub const CLEANED_UP_OUTPUT: &str = "Session completed (cleaned up)";

/// Protocol tuning
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub poll_interval: Duration,
    /// Messages fetched per history poll
    pub history_limit: u32,
    /// Added to the run timeout for the submit call's own transport timeout
    pub submit_margin: Duration,
    pub history_timeout: Duration,
    pub max_output_chars: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            history_limit: 5,
            submit_margin: Duration::from_secs(60),
            history_timeout: Duration::from_secs(15),
            max_output_chars: MAX_OUTPUT_CHARS,
        }
    }
}

/// Decides whether an assistant message is the session's final answer
pub trait TerminalDetector: Send + Sync + 'static {
    fn is_final(&self, text: &str) -> bool;
}

/// Treats any assistant message longer than `min_chars` as final
///
/// Short messages are usually tool-call stubs or acknowledgements.
#[derive(Debug, Clone, Copy)]
pub struct MinLengthDetector {
    pub min_chars: usize,
}

impl Default for MinLengthDetector {
    fn default() -> Self {
        Self { min_chars: 20 }
    }
}

impl TerminalDetector for MinLengthDetector {
    fn is_final(&self, text: &str) -> bool {
        text.chars().count() > self.min_chars
    }
}

enum Submitted {
    Inline(String),
    Session(String),
}

/// Spawn-and-poll client over a gateway adapter
pub struct SpawnClient<G> {
    gateway: G,
    config: SpawnConfig,
    detector: Box<dyn TerminalDetector>,
}

impl<G: GatewayAdapter> SpawnClient<G> {
    pub fn new(gateway: G, config: SpawnConfig) -> Self {
        Self {
            gateway,
            config,
            detector: Box::new(MinLengthDetector::default()),
        }
    }

    pub fn with_detector(mut self, detector: impl TerminalDetector) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Submit `task` to `agent` and wait up to `timeout` for its answer
    pub async fn spawn(
        &self,
        task: &str,
        agent: &str,
        timeout: Duration,
        heartbeat: &Heartbeat,
    ) -> Result<SpawnOutput, ActivityError> {
        let session_key = match self.submit_task(task, agent, timeout, heartbeat).await? {
            Submitted::Inline(summary) => {
                tracing::info!(agent, "spawn completed inline");
                return Ok(SpawnOutput {
                    output: truncate_chars(&summary, self.config.max_output_chars),
                    session_key: INLINE_SESSION_KEY.to_string(),
                });
            }
            Submitted::Session(key) => key,
        };

        tracing::info!(agent, session_key = %session_key, "spawned session, polling");
        self.poll(&session_key, timeout, heartbeat).await
    }

    /// Submit without waiting; returns the session key
    pub async fn submit(
        &self,
        task: &str,
        agent: &str,
        timeout: Duration,
        heartbeat: &Heartbeat,
    ) -> Result<Delegation, ActivityError> {
        let session_key = match self.submit_task(task, agent, timeout, heartbeat).await? {
            Submitted::Inline(_) => INLINE_SESSION_KEY.to_string(),
            Submitted::Session(key) => key,
        };
        Ok(Delegation { session_key })
    }

    async fn submit_task(
        &self,
        task: &str,
        agent: &str,
        timeout: Duration,
        heartbeat: &Heartbeat,
    ) -> Result<Submitted, ActivityError> {
        let args = json!({
            "task": task,
            "agentId": agent,
            "cleanup": "delete",
            "runTimeoutSeconds": timeout.as_secs(),
        });

        // The gateway may hold the request until the agent finishes
        let invoke = self
            .gateway
            .invoke("sessions_spawn", args, timeout + self.config.submit_margin);
        tokio::pin!(invoke);
        // Intervals reject a zero period
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
        let result = loop {
            tokio::select! {
                result = &mut invoke => break result,
                _ = ticks.tick() => heartbeat.beat(),
            }
        };

        let response = result.map_err(|e| match e {
            GatewayError::Decode { message, body } => {
                ActivityError::parse(format!("Spawn request failed: {message}"), &body)
            }
            other => ActivityError::transport(format!("Spawn request failed: {other}")),
        })?;

        if !response.ok {
            let error = response.error.as_deref().unwrap_or("unknown");
            return Err(ActivityError::rejected(format!("Spawn failed: {error}")));
        }

        let details = response.details();
        let field = |name: &str| {
            details
                .and_then(|d| d.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        if let Some(key) = field("childSessionKey") {
            return Ok(Submitted::Session(key));
        }
        // Might have finished before the response was sent
        if let Some(summary) = field("summary") {
            return Ok(Submitted::Inline(summary));
        }
        Err(ActivityError::rejected(
            "No childSessionKey in spawn response",
        ))
    }

    async fn poll(
        &self,
        session_key: &str,
        timeout: Duration,
        heartbeat: &Heartbeat,
    ) -> Result<SpawnOutput, ActivityError> {
        let deadline = Instant::now() + timeout;
        let args = json!({
            "sessionKey": session_key,
            "limit": self.config.history_limit,
            "includeTools": false,
        });

        while Instant::now() < deadline {
            heartbeat.beat();
            tokio::time::sleep(self.config.poll_interval).await;

            let response = match self
                .gateway
                .invoke("sessions_history", args.clone(), self.config.history_timeout)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(session_key, error = %e, "history poll failed, retrying next tick");
                    continue;
                }
            };

            if !response.ok {
                let error = response.error.as_deref().unwrap_or_default();
                if error.to_lowercase().contains("not found") {
                    tracing::info!(session_key, "session gone, treating as completed");
                    return Ok(SpawnOutput {
                        output: CLEANED_UP_OUTPUT.to_string(),
                        session_key: session_key.to_string(),
                    });
                }
                tracing::debug!(session_key, error, "history poll rejected, retrying next tick");
                continue;
            }

            let messages = response
                .details()
                .and_then(|d| d.get("messages"))
                .and_then(Value::as_array);
            if let Some(text) = messages.and_then(|m| self.final_message(m)) {
                return Ok(SpawnOutput {
                    output: truncate_chars(&text, self.config.max_output_chars),
                    session_key: session_key.to_string(),
                });
            }
        }

        Err(ActivityError::timeout(
            format!("Timed out after {}s", timeout.as_secs()),
            Some(session_key.to_string()),
        ))
    }

    /// Most recent assistant message the detector accepts
    fn final_message(&self, messages: &[Value]) -> Option<String> {
        messages
            .iter()
            .rev()
            .filter(|m| m.get("role").and_then(Value::as_str) == Some("assistant"))
            .map(|m| message_text(m.get("content").unwrap_or(&Value::Null)))
            .map(|text| text.trim().to_string())
            .find(|text| self.detector.is_final(text))
    }
}

/// Text of a message's content: a plain string or a list of typed parts
fn message_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
            .map(|p| p.get("text").and_then(Value::as_str).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
