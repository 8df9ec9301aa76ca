// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step results and end-of-run reports for multi-step workflows

use crate::limits::{truncate_chars, MAX_EXCERPT_CHARS, MAX_STEP_MESSAGE_CHARS, MAX_SUMMARY_LINE_CHARS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub name: String,
    pub message: String,
}

impl StepResult {
    pub fn passed(name: impl Into<String>, message: impl AsRef<str>) -> Self {
        Self::new(true, name, message)
    }

    pub fn failed(name: impl Into<String>, message: impl AsRef<str>) -> Self {
        Self::new(false, name, message)
    }

    fn new(success: bool, name: impl Into<String>, message: impl AsRef<str>) -> Self {
        Self {
            success,
            name: name.into(),
            message: truncate_chars(message.as_ref(), MAX_STEP_MESSAGE_CHARS),
        }
    }
}

/// Ordered step results of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    title: String,
    steps: Vec<StepResult>,
}

impl RunReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.len() - self.passed()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// `Err("{n} steps failed")` when any step failed
    pub fn outcome(&self) -> Result<(), String> {
        match self.failed() {
            0 => Ok(()),
            n => Err(format!("{n} steps failed")),
        }
    }

    /// Multi-line summary: header with counts, passed steps, then failed steps
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{}: ✅ {}/{}",
            self.title,
            self.passed(),
            self.steps.len()
        )];
        for step in self.steps.iter().filter(|s| s.success) {
            lines.push(format!(
                "  ✓ {}: {}",
                step.name,
                truncate_chars(&step.message, MAX_SUMMARY_LINE_CHARS)
            ));
        }
        for step in self.steps.iter().filter(|s| !s.success) {
            lines.push(format!(
                "  ✗ {}: {}",
                step.name,
                truncate_chars(&step.message, MAX_SUMMARY_LINE_CHARS)
            ));
        }
        lines.join("\n")
    }

    /// State-file document for this run
    pub fn to_state(&self, run_id: &str, finished_at: DateTime<Utc>) -> serde_json::Value {
        let steps: serde_json::Map<String, serde_json::Value> = self
            .steps
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    serde_json::json!({
                        "success": s.success,
                        "output": truncate_chars(&s.message, MAX_EXCERPT_CHARS),
                    }),
                )
            })
            .collect();
        serde_json::json!({
            "last_run": finished_at.to_rfc3339(),
            "run_id": run_id,
            "steps": steps,
        })
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
