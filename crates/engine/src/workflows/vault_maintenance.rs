// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Six-step knowledge base maintenance pipeline
//!
//! Steps run in a fixed order and a failing step never stops the pipeline.
//! The aggregated report is delivered and persisted before the run fails,
//! and it fails only if at least one step did.

use super::{agent, command, ping, render_task, template_vars, Workflow};
use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use sw_core::limits::{excerpt, truncate_chars};
use sw_core::{RunReport, StepResult};
use sw_runbook::WorkflowDef;

/// Characters of the scanner summary embedded in the fix task
const MAX_SCAN_SUMMARY_CHARS: usize = 8_000;

pub struct VaultMaintenance {
    def: WorkflowDef,
}

/// Everything one run needs
struct Pipeline<'a> {
    ctx: &'a WorkflowContext,
    def: &'a WorkflowDef,
    agent: &'a str,
    vars: HashMap<String, String>,
}

impl VaultMaintenance {
    pub fn new(def: WorkflowDef) -> Self {
        Self { def }
    }
}

#[async_trait]
impl Workflow for VaultMaintenance {
    fn name(&self) -> &str {
        &self.def.name
    }

    async fn run(&self, ctx: &WorkflowContext, input: Value) -> Result<String, WorkflowError> {
        let def = &self.def;
        let target = def.notify_target.as_deref();
        let pipeline = Pipeline {
            ctx,
            def,
            agent: agent(def)?,
            vars: template_vars(def, &input),
        };

        ctx.notify_to(
            target,
            &format!("🔧 {} Pipeline starting (6 steps)...", def.label),
        )
        .await?;

        let mut report = RunReport::new(&def.label);

        let step = pipeline
            .spawn_step("Conversation Extraction", "conversation_extraction", None)
            .await?;
        pipeline
            .record(&mut report, step, "conversation_extraction")
            .await?;

        let step = pipeline.ontology_scan().await?;
        pipeline.record(&mut report, step, "ontology_scan").await?;

        let step = pipeline.enrichment().await?;
        pipeline.record(&mut report, step, "enrichment").await?;

        let step = pipeline.spawn_step("Fixes", "fixes", None).await?;
        pipeline.record(&mut report, step, "fixes").await?;

        let step = pipeline.kb_sync().await?;
        pipeline.record(&mut report, step, "kb_sync").await?;

        let step = pipeline
            .spawn_step("Interlinking", "interlinking", None)
            .await?;
        pipeline.record(&mut report, step, "interlinking").await?;

        let summary = report.summary();
        ctx.notify_to(target, &format!("[WORKFLOW] {}\n{summary}", def.name))
            .await?;

        if let Some(path) = &def.state_file {
            let finished = ctx.read_clock().await?;
            if let Err(e) = ctx
                .save_state(path, report.to_state(ctx.run_id(), finished.utc))
                .await?
            {
                return Err(WorkflowError::failed(format!(
                    "failed to save run report: {e}"
                )));
            }
        }

        report.outcome().map_err(WorkflowError::Failed)?;
        Ok(summary)
    }
}

impl Pipeline<'_> {
    /// Append `step` and ping the step's monitor if it passed
    async fn record(
        &self,
        report: &mut RunReport,
        step: StepResult,
        key: &str,
    ) -> Result<(), WorkflowError> {
        tracing::info!(step = %step.name, success = step.success, "pipeline step finished");
        if step.success {
            ping(self.ctx, self.def, key).await?;
        }
        report.push(step);
        Ok(())
    }

    /// Spawn the agent on a task body; `task` overrides the runbook body
    async fn spawn_step(
        &self,
        name: &str,
        key: &str,
        task: Option<String>,
    ) -> Result<StepResult, WorkflowError> {
        let task = match task {
            Some(task) => task,
            None => render_task(self.def, key, &self.vars)?,
        };
        let step = match self
            .ctx
            .spawn_agent(&task, self.agent, self.def.timeout_for(key))
            .await?
        {
            Ok(spawned) => StepResult::passed(name, spawned.output),
            Err(e) => StepResult::failed(name, e.to_string()),
        };
        Ok(step)
    }

    async fn ontology_scan(&self) -> Result<StepResult, WorkflowError> {
        const NAME: &str = "Ontology Scan";
        let scan = self
            .ctx
            .run_script(
                command(self.def, "ontology_scan")?,
                self.def.timeout_for("ontology_scan"),
            )
            .await?;
        let output = match scan {
            Ok(scan) => scan.output,
            Err(e) => {
                return Ok(StepResult::failed(
                    NAME,
                    format!("Scanner failed: {}", excerpt(&e.to_string())),
                ))
            }
        };

        let summary: Value = match serde_json::from_str(&output) {
            Ok(summary) => summary,
            Err(_) => {
                return Ok(StepResult::failed(
                    NAME,
                    format!("Parse error: {}", excerpt(&output)),
                ))
            }
        };
        let total = summary.get("total").and_then(Value::as_u64).unwrap_or(0);
        if total == 0 {
            return Ok(StepResult::passed(NAME, "Clean — no issues"));
        }

        let pretty = serde_json::to_string_pretty(&summary).unwrap_or_else(|_| output.clone());
        let mut vars = self.vars.clone();
        vars.insert("total".into(), total.to_string());
        vars.insert(
            "summary_json".into(),
            truncate_chars(&pretty, MAX_SCAN_SUMMARY_CHARS),
        );
        let task = render_task(self.def, "ontology_fix", &vars)?;
        self.spawn_step(NAME, "ontology_fix", Some(task)).await
    }

    async fn enrichment(&self) -> Result<StepResult, WorkflowError> {
        const NAME: &str = "Enrichment";
        let thin = self
            .ctx
            .run_script(
                command(self.def, "thin_entities")?,
                self.def.timeout_for("thin_entities"),
            )
            .await?;
        let entities = match thin {
            Ok(thin) if !thin.output.trim().is_empty() => thin.output,
            // Nothing to enrich is not a failure
            _ => return Ok(StepResult::passed(NAME, "No thin entities found")),
        };

        let mut vars = self.vars.clone();
        vars.insert("thin_entities".into(), entities);
        let task = render_task(self.def, "enrichment", &vars)?;
        self.spawn_step(NAME, "enrichment", Some(task)).await
    }

    async fn kb_sync(&self) -> Result<StepResult, WorkflowError> {
        const NAME: &str = "KB Sync";
        let step = match self
            .ctx
            .run_script(command(self.def, "kb_sync")?, self.def.timeout_for("kb_sync"))
            .await?
        {
            Ok(sync) => StepResult::passed(NAME, sync.output),
            Err(e) => StepResult::failed(NAME, e.to_string()),
        };
        Ok(step)
    }
}

#[cfg(test)]
#[path = "vault_maintenance_tests.rs"]
mod tests;
