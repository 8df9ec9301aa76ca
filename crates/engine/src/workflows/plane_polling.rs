// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll the task tracker and delegate new todo tasks to agents

use super::{command, ping, render_task, template_vars, Workflow};
use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use sw_runbook::{interpolate, WorkflowDef};

/// Agent used when no route command is configured or it names none
const DEFAULT_AGENT: &str = "alfred";

/// Bookkeeping persisted between polls
#[derive(Debug, Default, Serialize, Deserialize)]
struct PollState {
    #[serde(default)]
    last_poll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(default)]
    delegated_tasks: Vec<Value>,
    #[serde(default)]
    known_todo_ids: Vec<Value>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

/// A todo task as reported by the fetch command
struct TodoTask {
    id: Value,
    name: String,
    description: String,
}

impl TodoTask {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str, default: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Self {
            id: value.get("id").cloned().unwrap_or(Value::Null),
            name: text("name", "Untitled"),
            description: text("description", ""),
        }
    }

    fn id_text(&self) -> String {
        match &self.id {
            Value::String(id) => id.clone(),
            Value::Null => "unknown".to_string(),
            other => other.to_string(),
        }
    }
}

pub struct PlanePolling {
    def: WorkflowDef,
}

impl PlanePolling {
    pub fn new(def: WorkflowDef) -> Self {
        Self { def }
    }
}

#[async_trait]
impl Workflow for PlanePolling {
    fn name(&self) -> &str {
        &self.def.name
    }

    async fn run(&self, ctx: &WorkflowContext, input: Value) -> Result<String, WorkflowError> {
        let def = &self.def;
        let path = def
            .state_file
            .as_deref()
            .ok_or_else(|| WorkflowError::failed(format!("{}: no state file configured", def.name)))?;

        let now = ctx.read_clock().await?.utc.to_rfc3339();
        let mut state = load(ctx, path).await?;

        let Some(todo) = self.fetch_todo(ctx).await? else {
            // A failed fetch must never read as "no tasks"
            ctx.notify_to(
                def.notify_target.as_deref(),
                &format!(
                    "[WORKFLOW] {} ❌\nFailed to fetch tasks from Plane. Check the fetch command and Plane API.",
                    def.name
                ),
            )
            .await?;
            state.last_poll = Some(now.clone());
            state.last_error = Some(now);
            save(ctx, path, &state).await?;
            return Err(WorkflowError::failed("Failed to fetch tasks from Plane"));
        };

        let new_tasks: Vec<TodoTask> = todo
            .iter()
            .map(TodoTask::from_value)
            .filter(|t| !state.known_todo_ids.contains(&t.id))
            .collect();

        if new_tasks.is_empty() {
            ping(ctx, def, "success").await?;
            state.last_poll = Some(now);
            save(ctx, path, &state).await?;
            return Ok(if todo.is_empty() {
                "No tasks".to_string()
            } else {
                "No new tasks".to_string()
            });
        }

        let vars = template_vars(def, &input);
        let mut delegated = Vec::new();
        for task in &new_tasks {
            tracing::info!(task = %task.name, "delegating");
            self.mark_in_progress(ctx, task).await?;

            let Some(agent) = self.route(ctx, task).await? else {
                continue;
            };

            let mut task_vars = vars.clone();
            task_vars.insert("task_id".into(), task.id_text());
            task_vars.insert("task_name".into(), task.name.clone());
            task_vars.insert("task_description".into(), task.description.clone());
            let body = render_task(def, "delegate", &task_vars)?;

            match ctx
                .delegate_agent(&body, &agent, def.timeout_for("delegate"))
                .await?
            {
                Ok(delegation) => {
                    state.known_todo_ids.push(task.id.clone());
                    delegated.push(json!({
                        "task_id": task.id,
                        "task_name": task.name,
                        "agent": agent,
                        "session_key": delegation.session_key,
                    }));
                }
                Err(e) => {
                    tracing::warn!(task = %task.name, error = %e, "delegation failed");
                }
            }
        }

        state.last_poll = Some(now);
        state.delegated_tasks.extend(delegated.iter().cloned());
        save(ctx, path, &state).await?;

        if !delegated.is_empty() {
            let lines: Vec<String> = delegated
                .iter()
                .map(|d| {
                    format!(
                        "• {} → {}",
                        d["task_name"].as_str().unwrap_or_default(),
                        d["agent"].as_str().unwrap_or_default()
                    )
                })
                .collect();
            ctx.notify_to(
                def.notify_target.as_deref(),
                &format!(
                    "[WORKFLOW] {}\n{} tasks delegated:\n{}",
                    def.name,
                    delegated.len(),
                    lines.join("\n")
                ),
            )
            .await?;
        }

        ping(ctx, def, "success").await?;
        Ok(format!("{} tasks delegated", delegated.len()))
    }
}

impl PlanePolling {
    /// Todo tasks, or `None` when the tracker could not be read
    async fn fetch_todo(&self, ctx: &WorkflowContext) -> Result<Option<Vec<Value>>, WorkflowError> {
        let def = &self.def;
        let output = match ctx
            .run_script(command(def, "fetch")?, def.timeout_for("fetch"))
            .await?
        {
            Ok(output) => output.output,
            Err(e) => {
                tracing::warn!(error = %e, "fetch command failed");
                return Ok(None);
            }
        };

        if output.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }
        match serde_json::from_str::<Value>(&output) {
            Ok(Value::Array(tasks)) => Ok(Some(tasks)),
            Ok(other) => {
                tracing::warn!(output = %other, "fetch command did not return a list");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetch output is not JSON");
                Ok(None)
            }
        }
    }

    /// Best-effort status update on the tracker
    async fn mark_in_progress(
        &self,
        ctx: &WorkflowContext,
        task: &TodoTask,
    ) -> Result<(), WorkflowError> {
        let Some(mark) = self.def.get_command("mark") else {
            return Ok(());
        };
        let vars = HashMap::from([("task_id".to_string(), shell_quote(&task.id_text()))]);
        if let Err(e) = ctx
            .run_script(&interpolate(mark, &vars), self.def.timeout_for("mark"))
            .await?
        {
            tracing::warn!(task = %task.name, error = %e, "failed to mark task in progress");
        }
        Ok(())
    }

    /// Agent for `task`; `None` skips the task this poll
    async fn route(
        &self,
        ctx: &WorkflowContext,
        task: &TodoTask,
    ) -> Result<Option<String>, WorkflowError> {
        let fallback = self.def.agent_or(DEFAULT_AGENT).to_string();
        let Some(route) = self.def.get_command("route") else {
            return Ok(Some(fallback));
        };

        let vars = HashMap::from([
            ("task_id".to_string(), shell_quote(&task.id_text())),
            ("task_name".to_string(), shell_quote(&task.name)),
        ]);
        let output = match ctx
            .run_script(&interpolate(route, &vars), self.def.timeout_for("route"))
            .await?
        {
            Ok(output) => output.output,
            Err(e) => {
                tracing::warn!(task = %task.name, error = %e, "routing failed, skipping task");
                return Ok(None);
            }
        };

        match serde_json::from_str::<Value>(&output) {
            Ok(decision) => Ok(Some(
                decision
                    .get("agent")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or(fallback),
            )),
            Err(e) => {
                tracing::warn!(task = %task.name, error = %e, "unreadable routing decision, skipping task");
                Ok(None)
            }
        }
    }
}

async fn load(ctx: &WorkflowContext, path: &Path) -> Result<PollState, WorkflowError> {
    let value = ctx
        .load_state(path)
        .await?
        .map_err(|e| WorkflowError::failed(format!("failed to load poll state: {e}")))?;
    serde_json::from_value(value)
        .map_err(|e| WorkflowError::failed(format!("invalid poll state: {e}")))
}

async fn save(ctx: &WorkflowContext, path: &Path, state: &PollState) -> Result<(), WorkflowError> {
    let value = serde_json::to_value(state)
        .map_err(|e| WorkflowError::failed(format!("invalid poll state: {e}")))?;
    ctx.save_state(path, value)
        .await?
        .map_err(|e| WorkflowError::failed(format!("failed to save poll state: {e}")))
}

/// Single-quote `text` for `sh -c`
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "plane_polling_tests.rs"]
mod tests;
