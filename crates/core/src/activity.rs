// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity invocations, their options and their recorded outputs.
//!
//! An activity is one externally-effecting unit of work issued by a
//! workflow. The invocation itself is plain serializable data so that it can
//! be journaled and compared on replay; the engine decides how to run it.

use crate::error::ActivityError;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Result of one activity as recorded in workflow history
pub type ActivityOutcome = Result<serde_json::Value, ActivityError>;

/// Typed activity result handed back to workflow code
pub type ActivityResult<T> = Result<T, ActivityError>;

/// A single activity invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Activity {
    /// Delegate a task to a subagent and wait for its final answer
    SpawnAgent {
        task: String,
        agent: String,
        #[serde(with = "humantime_serde")]
        timeout: Duration,
    },
    /// Submit a task to a subagent without waiting for it
    DelegateAgent {
        task: String,
        agent: String,
        #[serde(with = "humantime_serde")]
        timeout: Duration,
    },
    /// Run a shell command
    RunScript {
        command: String,
        #[serde(with = "humantime_serde")]
        timeout: Duration,
    },
    /// Post a chat message
    Notify {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    /// Hit an uptime monitor's push endpoint
    PingUptime { key: String },
    /// Read the wall clock in the configured timezone
    ReadClock,
    /// Read a JSON state file (`{}` when absent)
    LoadState { path: PathBuf },
    /// Write a JSON state file
    SaveState {
        path: PathBuf,
        data: serde_json::Value,
    },
}

impl Activity {
    /// Stable kind tag, recorded in history and checked on replay
    pub fn kind(&self) -> &'static str {
        match self {
            Activity::SpawnAgent { .. } => "spawn_agent",
            Activity::DelegateAgent { .. } => "delegate_agent",
            Activity::RunScript { .. } => "run_script",
            Activity::Notify { .. } => "notify",
            Activity::PingUptime { .. } => "ping_uptime",
            Activity::ReadClock => "read_clock",
            Activity::LoadState { .. } => "load_state",
            Activity::SaveState { .. } => "save_state",
        }
    }

    /// Key fields for log output, without bulky payloads
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Activity::SpawnAgent { agent, timeout, .. }
            | Activity::DelegateAgent { agent, timeout, .. } => vec![
                ("agent", agent.clone()),
                ("timeout_secs", timeout.as_secs().to_string()),
            ],
            Activity::RunScript { command, timeout } => vec![
                ("command", crate::limits::truncate_chars(command, 100)),
                ("timeout_secs", timeout.as_secs().to_string()),
            ],
            Activity::Notify { target, .. } => {
                vec![("target", target.clone().unwrap_or_default())]
            }
            Activity::PingUptime { key } => vec![("key", key.clone())],
            Activity::ReadClock => vec![],
            Activity::LoadState { path } | Activity::SaveState { path, .. } => {
                vec![("path", path.display().to_string())]
            }
        }
    }
}

/// Per-invocation execution policy
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOptions {
    /// Ceiling on a single attempt, enforced by the runtime
    pub start_to_close: Duration,
    /// Maximum gap between heartbeats before the attempt is cancelled
    pub heartbeat_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl ActivityOptions {
    /// Extra time granted to a spawn activity beyond the agent's own timeout
    pub const SPAWN_MARGIN: Duration = Duration::from_secs(120);
    /// Extra time granted to a script activity beyond its own timeout
    pub const SCRIPT_MARGIN: Duration = Duration::from_secs(30);
    /// Heartbeat timeout used for polling activities
    pub const SPAWN_HEARTBEAT: Duration = Duration::from_secs(60);

    pub fn new(start_to_close: Duration) -> Self {
        Self {
            start_to_close,
            heartbeat_timeout: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Options for a spawn-and-poll activity whose agent runs for `timeout`
    pub fn for_spawn(timeout: Duration) -> Self {
        Self::new(timeout + Self::SPAWN_MARGIN).with_heartbeat(Self::SPAWN_HEARTBEAT)
    }

    /// Options for a script that kills itself after `timeout`
    pub fn for_script(timeout: Duration) -> Self {
        Self::new(timeout + Self::SCRIPT_MARGIN)
    }

    pub fn with_heartbeat(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Automatic retry policy for a failed activity attempt
///
/// The default is a single attempt: failures go straight back to the
/// workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_coefficient: u32,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2,
            max_interval: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Whether another attempt should follow `attempt` (1-based) failing with `error`
    pub fn should_retry(&self, attempt: u32, error: &ActivityError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_coefficient
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

/// Output of `spawn_agent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnOutput {
    pub output: String,
    /// Session handle, or `"completed-inline"` when the gateway answered directly
    pub session_key: String,
}

/// Output of `delegate_agent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub session_key: String,
}

/// Output of `run_script`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub output: String,
    pub exit_code: i32,
}

/// Output of `read_clock`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockReading {
    pub utc: DateTime<Utc>,
    pub local: DateTime<FixedOffset>,
    /// Day of week in the configured timezone, 0 = Monday
    pub weekday: u32,
}

impl ClockReading {
    pub fn is_monday(&self) -> bool {
        self.weekday == 0
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
