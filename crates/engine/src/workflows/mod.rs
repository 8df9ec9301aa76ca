// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definitions
//!
//! Each kind is deterministic orchestration over [`WorkflowContext`]. Task
//! bodies, commands and agent ids come from the runbook definition; the code
//! only decides order, branching and reporting.

mod agent_task;
mod daily_briefing;
mod plane_polling;
mod vault_maintenance;

pub use agent_task::AgentTask;
pub use daily_briefing::DailyBriefing;
pub use plane_polling::PlanePolling;
pub use vault_maintenance::VaultMaintenance;

use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use sw_runbook::{interpolate, Runbook, WorkflowDef, WorkflowKind};

/// A runnable workflow
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Run to completion, returning a short result message
    async fn run(&self, ctx: &WorkflowContext, input: Value) -> Result<String, WorkflowError>;
}

/// Build the workflow implementing `def`
pub fn build(def: &WorkflowDef) -> Arc<dyn Workflow> {
    match def.kind {
        WorkflowKind::DailyBriefing => Arc::new(DailyBriefing::new(def.clone())),
        WorkflowKind::VaultMaintenance => Arc::new(VaultMaintenance::new(def.clone())),
        WorkflowKind::PlanePolling => Arc::new(PlanePolling::new(def.clone())),
        WorkflowKind::AgentTask => Arc::new(AgentTask::new(def.clone())),
    }
}

/// Workflows by name
#[derive(Default, Clone)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<String, Arc<dyn Workflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runbook(runbook: &Runbook) -> Self {
        let mut registry = Self::new();
        for def in runbook.workflows.values() {
            registry.register(build(def));
        }
        registry
    }

    pub fn register(&mut self, workflow: Arc<dyn Workflow>) {
        self.workflows.insert(workflow.name().to_string(), workflow);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Workflow>> {
        self.workflows.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.workflows.keys().map(String::as_str).collect()
    }
}

/// Template variables: the definition's vars, overridden by string fields of `input`
fn template_vars(def: &WorkflowDef, input: &Value) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = def
        .vars
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if let Some(fields) = input.as_object() {
        for (key, value) in fields {
            if let Some(text) = value.as_str() {
                vars.insert(key.clone(), text.to_string());
            }
        }
    }
    vars
}

/// Named task body with variables filled in
fn render_task(
    def: &WorkflowDef,
    name: &str,
    vars: &HashMap<String, String>,
) -> Result<String, WorkflowError> {
    def.get_task(name)
        .map(|task| interpolate(task, vars))
        .ok_or_else(|| WorkflowError::failed(format!("{}: no task named '{name}'", def.name)))
}

fn command<'a>(def: &'a WorkflowDef, name: &str) -> Result<&'a str, WorkflowError> {
    def.get_command(name)
        .ok_or_else(|| WorkflowError::failed(format!("{}: no command named '{name}'", def.name)))
}

fn agent(def: &WorkflowDef) -> Result<&str, WorkflowError> {
    def.agent
        .as_deref()
        .ok_or_else(|| WorkflowError::failed(format!("{}: no agent configured", def.name)))
}

/// Ping the uptime monitor registered for `role`, if any
async fn ping(ctx: &WorkflowContext, def: &WorkflowDef, role: &str) -> Result<(), WorkflowError> {
    if let Some(key) = def.uptime_key(role) {
        ctx.ping_uptime(key).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
