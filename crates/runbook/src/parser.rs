// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook TOML parsing

use crate::template::expand_env;
use crate::{PingPolicy, WorkflowDef, WorkflowKind, DEFAULT_AGENT_TIMEOUT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sw_core::{CronError, CronExpr, ScheduleSpec, TriggerRule, DEFAULT_EXECUTION_TIMEOUT};
use thiserror::Error;

/// Errors that can occur during runbook parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("invalid cron expression in {field}: {source}")]
    Cron {
        field: String,
        #[source]
        source: CronError,
    },
}

/// A parsed runbook
#[derive(Debug, Clone, Default)]
pub struct Runbook {
    pub schedules: BTreeMap<String, ScheduleSpec>,
    pub workflows: BTreeMap<String, WorkflowDef>,
}

impl Runbook {
    /// Get a workflow definition by name
    pub fn get_workflow(&self, name: &str) -> Option<&WorkflowDef> {
        self.workflows.get(name)
    }

    /// Get a schedule by id
    pub fn get_schedule(&self, id: &str) -> Option<&ScheduleSpec> {
        self.schedules.get(id)
    }

    /// Desired schedule set, ordered by id
    pub fn schedule_specs(&self) -> Vec<ScheduleSpec> {
        self.schedules.values().cloned().collect()
    }
}

/// Read and parse a runbook file
pub fn load_runbook(path: &Path) -> Result<Runbook, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_runbook(&content)
}

/// Parse a runbook from TOML content
pub fn parse_runbook(content: &str) -> Result<Runbook, ParseError> {
    let raw: toml::Value = toml::from_str(content)?;
    let table = raw
        .as_table()
        .ok_or_else(|| ParseError::InvalidFormat("root must be a table".to_string()))?;

    let mut runbook = Runbook::default();

    // Shared placeholder values
    let shared_vars = match table.get("vars") {
        Some(value) => string_map("vars", value)?,
        None => BTreeMap::new(),
    };

    // Parse workflows
    if let Some(workflows) = table.get("workflow").and_then(|v| v.as_table()) {
        for (name, value) in workflows {
            let workflow = parse_workflow(name, value, &shared_vars)?;
            runbook.workflows.insert(name.clone(), workflow);
        }
    }

    // Parse schedules
    if let Some(schedules) = table.get("schedule").and_then(|v| v.as_table()) {
        for (id, value) in schedules {
            let spec = parse_schedule(id, value)?;
            if !runbook.workflows.contains_key(&spec.workflow) {
                return Err(ParseError::InvalidFormat(format!(
                    "schedule.{}: unknown workflow '{}'",
                    id, spec.workflow
                )));
            }
            runbook.schedules.insert(id.clone(), spec);
        }
    }

    Ok(runbook)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkflow {
    kind: WorkflowKind,
    label: Option<String>,
    agent: Option<String>,
    #[serde(default, with = "humantime_serde")]
    timeout: Option<Duration>,
    task: Option<String>,
    #[serde(default)]
    tasks: BTreeMap<String, String>,
    #[serde(default)]
    commands: BTreeMap<String, String>,
    #[serde(default)]
    timeouts: BTreeMap<String, String>,
    #[serde(default)]
    uptime: BTreeMap<String, String>,
    #[serde(default)]
    ping: PingPolicy,
    state_file: Option<String>,
    notify_target: Option<String>,
    #[serde(default)]
    quiet_markers: Vec<String>,
    #[serde(default)]
    detail: bool,
    raise_on_failure: Option<bool>,
    #[serde(default)]
    vars: BTreeMap<String, String>,
}

fn parse_workflow(
    name: &str,
    value: &toml::Value,
    shared_vars: &BTreeMap<String, String>,
) -> Result<WorkflowDef, ParseError> {
    let raw: RawWorkflow = value.clone().try_into().map_err(|e: toml::de::Error| {
        ParseError::InvalidFormat(format!("workflow.{}: {}", name, e))
    })?;

    let mut timeouts = BTreeMap::new();
    for (step, text) in &raw.timeouts {
        let duration = humantime::parse_duration(text).map_err(|e| {
            ParseError::InvalidFormat(format!("workflow.{}.timeouts.{}: {}", name, step, e))
        })?;
        timeouts.insert(step.clone(), duration);
    }

    let mut vars = shared_vars.clone();
    vars.extend(raw.vars);

    let expand_all = |map: BTreeMap<String, String>| -> BTreeMap<String, String> {
        map.into_iter().map(|(k, v)| (k, expand_env(&v))).collect()
    };

    let def = WorkflowDef {
        name: name.to_string(),
        kind: raw.kind,
        label: raw.label.unwrap_or_else(|| name.to_string()),
        agent: raw.agent,
        timeout: raw.timeout.unwrap_or(DEFAULT_AGENT_TIMEOUT),
        task: raw.task.as_deref().map(expand_env),
        tasks: expand_all(raw.tasks),
        commands: expand_all(raw.commands),
        timeouts,
        uptime: raw.uptime,
        ping: raw.ping,
        state_file: raw.state_file.as_deref().map(expand_env).map(PathBuf::from),
        notify_target: raw.notify_target,
        quiet_markers: raw.quiet_markers,
        detail: raw.detail,
        raise_on_failure: raw.raise_on_failure.unwrap_or(true),
        vars: expand_all(vars),
    };

    validate_workflow(&def)?;
    Ok(def)
}

/// Check that a definition carries what its kind needs
fn validate_workflow(def: &WorkflowDef) -> Result<(), ParseError> {
    let missing = |field: &str| ParseError::MissingField(format!("workflow.{}.{}", def.name, field));

    let (tasks, commands): (Vec<&str>, Vec<&str>) = match def.kind {
        WorkflowKind::AgentTask => {
            if def.task.is_none() {
                return Err(missing("task"));
            }
            (vec![], vec![])
        }
        WorkflowKind::DailyBriefing => (vec!["monday", "daily"], vec![]),
        WorkflowKind::VaultMaintenance => (
            vec![
                "conversation_extraction",
                "ontology_fix",
                "enrichment",
                "fixes",
                "interlinking",
            ],
            vec!["ontology_scan", "thin_entities", "kb_sync"],
        ),
        WorkflowKind::PlanePolling => {
            if def.state_file.is_none() {
                return Err(missing("state_file"));
            }
            (vec!["delegate"], vec!["fetch"])
        }
    };

    for task in tasks {
        if !def.tasks.contains_key(task) {
            return Err(missing(&format!("tasks.{task}")));
        }
    }
    for command in commands {
        if !def.commands.contains_key(command) {
            return Err(missing(&format!("commands.{command}")));
        }
    }

    if def.kind != WorkflowKind::PlanePolling && def.agent.is_none() {
        return Err(missing("agent"));
    }

    Ok(())
}

fn parse_schedule(id: &str, value: &toml::Value) -> Result<ScheduleSpec, ParseError> {
    let table = value
        .as_table()
        .ok_or_else(|| ParseError::InvalidFormat(format!("schedule.{} must be a table", id)))?;

    let workflow = table
        .get("workflow")
        .and_then(|v| v.as_str())
        .unwrap_or(id)
        .to_string();

    let trigger = match (table.get("cron"), table.get("every")) {
        (Some(cron), None) => TriggerRule::Cron {
            expressions: parse_cron_list(id, cron)?,
        },
        (None, Some(every)) => TriggerRule::Interval {
            every: parse_duration_field(&format!("schedule.{}.every", id), every)?,
        },
        (Some(_), Some(_)) => {
            return Err(ParseError::InvalidFormat(format!(
                "schedule.{}: cron and every are mutually exclusive",
                id
            )))
        }
        (None, None) => return Err(ParseError::MissingField(format!("schedule.{}.cron", id))),
    };

    let execution_timeout = match table.get("execution_timeout") {
        Some(v) => parse_duration_field(&format!("schedule.{}.execution_timeout", id), v)?,
        None => DEFAULT_EXECUTION_TIMEOUT,
    };

    let memo = table
        .get("memo")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let mut spec = ScheduleSpec::new(id, workflow, trigger).with_memo(memo);
    spec.execution_timeout = execution_timeout;
    Ok(spec)
}

/// `cron` may be a single expression or a list of them
fn parse_cron_list(id: &str, value: &toml::Value) -> Result<Vec<CronExpr>, ParseError> {
    let field = format!("schedule.{}.cron", id);
    let texts: Vec<&str> = match value {
        toml::Value::String(s) => vec![s.as_str()],
        toml::Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| {
                    ParseError::InvalidFormat(format!("{}: entries must be strings", field))
                })
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(ParseError::InvalidFormat(format!(
                "{}: expected string or array",
                field
            )))
        }
    };

    if texts.is_empty() {
        return Err(ParseError::InvalidFormat(format!("{}: empty list", field)));
    }

    texts
        .into_iter()
        .map(|text| {
            CronExpr::parse(text).map_err(|source| ParseError::Cron {
                field: field.clone(),
                source,
            })
        })
        .collect()
}

fn parse_duration_field(field: &str, value: &toml::Value) -> Result<Duration, ParseError> {
    let text = value
        .as_str()
        .ok_or_else(|| ParseError::InvalidFormat(format!("{}: expected a duration string", field)))?;
    let duration = humantime::parse_duration(text)
        .map_err(|e| ParseError::InvalidFormat(format!("{}: {}", field, e)))?;
    if duration.is_zero() {
        return Err(ParseError::InvalidFormat(format!("{}: must be positive", field)));
    }
    Ok(duration)
}

fn string_map(field: &str, value: &toml::Value) -> Result<BTreeMap<String, String>, ParseError> {
    let table = value
        .as_table()
        .ok_or_else(|| ParseError::InvalidFormat(format!("{} must be a table", field)))?;
    table
        .iter()
        .map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), s.to_string()))
                .ok_or_else(|| ParseError::InvalidFormat(format!("{}.{} must be a string", field, k)))
        })
        .collect()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
