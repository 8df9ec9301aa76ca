// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Morning briefing, with a longer variant on Mondays

use super::{agent, ping, render_task, template_vars, Workflow};
use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use async_trait::async_trait;
use serde_json::Value;
use sw_core::limits::excerpt;
use sw_runbook::WorkflowDef;

pub struct DailyBriefing {
    def: WorkflowDef,
}

impl DailyBriefing {
    pub fn new(def: WorkflowDef) -> Self {
        Self { def }
    }
}

#[async_trait]
impl Workflow for DailyBriefing {
    fn name(&self) -> &str {
        &self.def.name
    }

    async fn run(&self, ctx: &WorkflowContext, input: Value) -> Result<String, WorkflowError> {
        let def = &self.def;
        let target = def.notify_target.as_deref();

        // The weekday is a recorded activity result, so replays take the same branch
        let reading = ctx.read_clock().await?;
        let (task_name, label) = if reading.is_monday() {
            ("monday", "Monday Briefing")
        } else {
            ("daily", "Daily Briefing")
        };
        let task = render_task(def, task_name, &template_vars(def, &input))?;

        ctx.notify_to(target, &format!("[WORKFLOW] {label} starting..."))
            .await?;

        match ctx
            .spawn_agent(&task, agent(def)?, def.timeout_for(task_name))
            .await?
        {
            Ok(_) => {
                ctx.notify_to(target, &format!("[WORKFLOW] {label} ✅ delivered"))
                    .await?;
                ping(ctx, def, "success").await?;
                Ok(format!("{label} delivered"))
            }
            Err(e) => {
                let reason = excerpt(&e.to_string());
                ctx.notify_to(target, &format!("[WORKFLOW] {label} ❌ failed: {reason}"))
                    .await?;
                Err(WorkflowError::failed(format!("{label} failed: {reason}")))
            }
        }
    }
}

#[cfg(test)]
#[path = "daily_briefing_tests.rs"]
mod tests;
