// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single agent spawn with one notification

use super::{agent, ping, template_vars, Workflow};
use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use async_trait::async_trait;
use serde_json::Value;
use sw_core::limits::{excerpt, truncate_chars, MAX_STEP_MESSAGE_CHARS};
use sw_runbook::{interpolate, PingPolicy, WorkflowDef};

pub struct AgentTask {
    def: WorkflowDef,
}

impl AgentTask {
    pub fn new(def: WorkflowDef) -> Self {
        Self { def }
    }

    fn message(&self, success: bool, output: &str) -> String {
        let status = if success { "✅" } else { "❌" };
        let mut message = format!("[WORKFLOW] {} {status}", self.def.label);
        if self.def.detail {
            message.push('\n');
            message.push_str(&excerpt(output));
        }
        message
    }
}

#[async_trait]
impl Workflow for AgentTask {
    fn name(&self) -> &str {
        &self.def.name
    }

    async fn run(&self, ctx: &WorkflowContext, input: Value) -> Result<String, WorkflowError> {
        let def = &self.def;
        let task = def
            .task
            .as_deref()
            .map(|task| interpolate(task, &template_vars(def, &input)))
            .ok_or_else(|| WorkflowError::failed(format!("{}: no task configured", def.name)))?;

        let outcome = ctx
            .spawn_agent(&task, agent(def)?, def.timeout)
            .await?
            .map(|spawned| spawned.output)
            .map_err(|e| e.to_string());
        let (success, output) = match &outcome {
            Ok(output) => (true, output.as_str()),
            Err(error) => (false, error.as_str()),
        };

        if success && def.is_quiet(output) {
            tracing::info!(workflow = %def.name, "nothing to report");
        } else {
            ctx.notify_to(def.notify_target.as_deref(), &self.message(success, output))
                .await?;
        }

        if success || def.ping == PingPolicy::Always {
            ping(ctx, def, "success").await?;
        }

        match outcome {
            Ok(output) => Ok(truncate_chars(&output, MAX_STEP_MESSAGE_CHARS)),
            Err(error) if def.raise_on_failure => {
                Err(WorkflowError::failed(format!("Failed: {}", excerpt(&error))))
            }
            Err(error) => Ok(format!("Failed: {}", excerpt(&error))),
        }
    }
}

#[cfg(test)]
#[path = "agent_task_tests.rs"]
mod tests;
