// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definitions
//!
//! Everything a workflow says to an agent or a shell lives here: task bodies,
//! commands, agent ids and timeouts. The engine picks behaviour by `kind`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default agent run timeout
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Which engine workflow implements a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    /// Weekday-dependent briefing spawn
    DailyBriefing,
    /// Six-step knowledge base pipeline
    VaultMaintenance,
    /// Poll the task tracker and delegate new tasks
    PlanePolling,
    /// One spawn, one notification
    AgentTask,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowKind::DailyBriefing => "daily-briefing",
            WorkflowKind::VaultMaintenance => "vault-maintenance",
            WorkflowKind::PlanePolling => "plane-polling",
            WorkflowKind::AgentTask => "agent-task",
        };
        f.write_str(name)
    }
}

/// When an agent task pings its uptime monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingPolicy {
    #[default]
    Success,
    Always,
}

/// A parsed `[workflow.<name>]` table
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDef {
    pub name: String,
    pub kind: WorkflowKind,
    /// Human label used in notifications
    pub label: String,
    pub agent: Option<String>,
    /// Agent run timeout
    pub timeout: Duration,
    /// Single task body (agent-task)
    pub task: Option<String>,
    /// Named task bodies
    pub tasks: BTreeMap<String, String>,
    /// Named shell commands
    pub commands: BTreeMap<String, String>,
    /// Per-step timeouts, keyed like `tasks` and `commands`
    pub timeouts: BTreeMap<String, Duration>,
    /// Uptime monitor key per role (`success`, or a step name)
    pub uptime: BTreeMap<String, String>,
    pub ping: PingPolicy,
    pub state_file: Option<PathBuf>,
    /// Chat target overriding the daemon default
    pub notify_target: Option<String>,
    /// Output markers that suppress the notification (case-insensitive)
    pub quiet_markers: Vec<String>,
    /// Include an output excerpt in the notification
    pub detail: bool,
    pub raise_on_failure: bool,
    /// Values available to every `{var}` placeholder
    pub vars: BTreeMap<String, String>,
}

impl WorkflowDef {
    pub fn new(name: impl Into<String>, kind: WorkflowKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            agent: None,
            timeout: DEFAULT_AGENT_TIMEOUT,
            task: None,
            tasks: BTreeMap::new(),
            commands: BTreeMap::new(),
            timeouts: BTreeMap::new(),
            uptime: BTreeMap::new(),
            ping: PingPolicy::Success,
            state_file: None,
            notify_target: None,
            quiet_markers: Vec::new(),
            detail: false,
            raise_on_failure: true,
            vars: BTreeMap::new(),
        }
    }

    pub fn get_task(&self, name: &str) -> Option<&str> {
        self.tasks.get(name).map(String::as_str)
    }

    pub fn get_command(&self, name: &str) -> Option<&str> {
        self.commands.get(name).map(String::as_str)
    }

    /// Timeout for a named step, falling back to the workflow timeout
    pub fn timeout_for(&self, step: &str) -> Duration {
        self.timeouts.get(step).copied().unwrap_or(self.timeout)
    }

    pub fn uptime_key(&self, role: &str) -> Option<&str> {
        self.uptime.get(role).map(String::as_str)
    }

    /// Agent id, or `fallback` when the definition names none
    pub fn agent_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.agent.as_deref().unwrap_or(fallback)
    }

    /// True if `output` contains any quiet marker
    pub fn is_quiet(&self, output: &str) -> bool {
        let lower = output.to_lowercase();
        self.quiet_markers
            .iter()
            .any(|m| lower.contains(&m.to_lowercase()))
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
