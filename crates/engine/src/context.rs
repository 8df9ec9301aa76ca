// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replaying workflow context
//!
//! Workflow code talks to the outside world only through [`WorkflowContext`].
//! Each call takes the next sequence number. If history already holds a
//! completion for that number the recorded outcome is returned and nothing
//! runs; otherwise the call is journaled, executed and its outcome recorded.
//! Re-running workflow code against its own history therefore reproduces
//! every decision without repeating completed side effects.

use crate::activity::ActivityExecutor;
use crate::error::WorkflowError;
use crate::journal::Journal;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sw_core::{
    Activity, ActivityOptions, ActivityOutcome, ActivityResult, ClockReading, Delegation,
    HistoryEvent, Operation, ScriptOutput, SpawnOutput,
};

/// Start-to-close for activities that finish in seconds
const SHORT_ACTIVITY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
enum Recorded {
    Scheduled { kind: String },
    Completed { kind: String, outcome: ActivityOutcome },
    Timer { fire_at: DateTime<Utc>, fired: bool },
}

impl Recorded {
    fn describe(&self) -> &str {
        match self {
            Recorded::Scheduled { kind } | Recorded::Completed { kind, .. } => kind,
            Recorded::Timer { .. } => "timer",
        }
    }
}

fn index(history: &[HistoryEvent]) -> HashMap<u32, Recorded> {
    let mut recorded = HashMap::new();
    for event in history {
        match event {
            HistoryEvent::ActivityScheduled { seq, kind } => {
                recorded
                    .entry(*seq)
                    .or_insert_with(|| Recorded::Scheduled { kind: kind.clone() });
            }
            HistoryEvent::ActivityCompleted { seq, kind, outcome } => {
                recorded.insert(
                    *seq,
                    Recorded::Completed {
                        kind: kind.clone(),
                        outcome: outcome.clone(),
                    },
                );
            }
            HistoryEvent::TimerStarted { seq, fire_at } => {
                recorded.insert(
                    *seq,
                    Recorded::Timer {
                        fire_at: *fire_at,
                        fired: false,
                    },
                );
            }
            HistoryEvent::TimerFired { seq } => {
                if let Some(Recorded::Timer { fired, .. }) = recorded.get_mut(seq) {
                    *fired = true;
                }
            }
        }
    }
    recorded
}

/// Execution context handed to workflow code for one run
pub struct WorkflowContext {
    run_id: String,
    workflow_id: String,
    recorded: HashMap<u32, Recorded>,
    next_seq: AtomicU32,
    journal: Journal,
    executor: ActivityExecutor,
}

impl WorkflowContext {
    pub fn new(
        run_id: impl Into<String>,
        workflow_id: impl Into<String>,
        history: &[HistoryEvent],
        journal: Journal,
        executor: ActivityExecutor,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            workflow_id: workflow_id.into(),
            recorded: index(history),
            next_seq: AtomicU32::new(1),
            journal,
            executor,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    fn take_seq(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    fn mismatch(&self, seq: u32, recorded: &Recorded, requested: &str) -> WorkflowError {
        WorkflowError::NonDeterministic {
            run_id: self.run_id.clone(),
            seq,
            recorded: recorded.describe().to_string(),
            requested: requested.to_string(),
        }
    }

    /// Run `activity` under `options`, or return its recorded outcome
    pub async fn execute_activity(
        &self,
        activity: &Activity,
        options: &ActivityOptions,
    ) -> Result<ActivityOutcome, WorkflowError> {
        let seq = self.take_seq();
        let kind = activity.kind();

        match self.recorded.get(&seq) {
            Some(Recorded::Completed {
                kind: recorded,
                outcome,
            }) if recorded == kind => {
                tracing::debug!(seq, kind, "replayed from history");
                return Ok(outcome.clone());
            }
            Some(Recorded::Scheduled { kind: recorded }) if recorded == kind => {
                tracing::warn!(
                    invocation_id = %format!("{}:{}", self.run_id, seq),
                    kind,
                    "activity was interrupted, executing again"
                );
            }
            Some(other) => return Err(self.mismatch(seq, other, kind)),
            None => {
                self.journal.persist(Operation::ActivityScheduled {
                    run_id: self.run_id.clone(),
                    seq,
                    kind: kind.to_string(),
                })?;
            }
        }

        let journal = self.journal.clone();
        let run_id = self.run_id.clone();
        let on_beat: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            let op = Operation::ActivityHeartbeat {
                run_id: run_id.clone(),
                at: journal.now(),
            };
            if let Err(e) = journal.persist(op) {
                tracing::warn!(error = %e, "failed to record heartbeat");
            }
        });

        let outcome = self.executor.execute(activity, options, Some(on_beat)).await;

        self.journal.persist(Operation::ActivityCompleted {
            run_id: self.run_id.clone(),
            seq,
            kind: kind.to_string(),
            outcome: outcome.clone(),
        })?;
        Ok(outcome)
    }

    /// Execute and decode a successful output into `T`
    async fn call<T: DeserializeOwned>(
        &self,
        activity: Activity,
        options: ActivityOptions,
    ) -> Result<ActivityResult<T>, WorkflowError> {
        match self.execute_activity(&activity, &options).await? {
            Ok(value) => serde_json::from_value(value)
                .map(Ok)
                .map_err(|e| WorkflowError::Decode {
                    kind: activity.kind().to_string(),
                    message: e.to_string(),
                }),
            Err(e) => Ok(Err(e)),
        }
    }

    /// Spawn an agent and wait for its answer
    pub async fn spawn_agent(
        &self,
        task: &str,
        agent: &str,
        timeout: Duration,
    ) -> Result<ActivityResult<SpawnOutput>, WorkflowError> {
        let activity = Activity::SpawnAgent {
            task: task.to_string(),
            agent: agent.to_string(),
            timeout,
        };
        self.call(activity, ActivityOptions::for_spawn(timeout)).await
    }

    /// Hand a task to an agent without waiting for it
    pub async fn delegate_agent(
        &self,
        task: &str,
        agent: &str,
        timeout: Duration,
    ) -> Result<ActivityResult<Delegation>, WorkflowError> {
        let activity = Activity::DelegateAgent {
            task: task.to_string(),
            agent: agent.to_string(),
            timeout,
        };
        let options = ActivityOptions::new(timeout + ActivityOptions::SPAWN_MARGIN);
        self.call(activity, options).await
    }

    pub async fn run_script(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ActivityResult<ScriptOutput>, WorkflowError> {
        let activity = Activity::RunScript {
            command: command.to_string(),
            timeout,
        };
        self.call(activity, ActivityOptions::for_script(timeout))
            .await
    }

    /// Best-effort message to the default chat target
    pub async fn notify(&self, message: &str) -> Result<(), WorkflowError> {
        self.notify_to(None, message).await
    }

    /// Best-effort message; a failed delivery is logged and otherwise ignored
    pub async fn notify_to(
        &self,
        target: Option<&str>,
        message: &str,
    ) -> Result<(), WorkflowError> {
        let activity = Activity::Notify {
            message: message.to_string(),
            target: target.map(String::from),
        };
        if let Err(e) = self
            .call::<Value>(activity, ActivityOptions::new(SHORT_ACTIVITY))
            .await?
        {
            tracing::warn!(error = %e, "notification not delivered");
        }
        Ok(())
    }

    /// Ping an uptime monitor; false when unknown or unreachable
    pub async fn ping_uptime(&self, key: &str) -> Result<bool, WorkflowError> {
        let activity = Activity::PingUptime {
            key: key.to_string(),
        };
        Ok(self
            .call::<bool>(activity, ActivityOptions::new(SHORT_ACTIVITY))
            .await?
            .unwrap_or(false))
    }

    /// Current time and weekday, recorded so replays see the same reading
    pub async fn read_clock(&self) -> Result<ClockReading, WorkflowError> {
        self.call(Activity::ReadClock, ActivityOptions::new(SHORT_ACTIVITY))
            .await?
            .map_err(|e| WorkflowError::failed(format!("clock unavailable: {e}")))
    }

    pub async fn load_state(&self, path: &Path) -> Result<ActivityResult<Value>, WorkflowError> {
        let activity = Activity::LoadState {
            path: path.to_path_buf(),
        };
        self.call(activity, ActivityOptions::new(SHORT_ACTIVITY))
            .await
    }

    pub async fn save_state(
        &self,
        path: &Path,
        data: Value,
    ) -> Result<ActivityResult<()>, WorkflowError> {
        let activity = Activity::SaveState {
            path: path.to_path_buf(),
            data,
        };
        let outcome = self
            .call::<Value>(activity, ActivityOptions::new(SHORT_ACTIVITY))
            .await?;
        Ok(outcome.map(|_| ()))
    }

    /// Durable timer: survives restarts, and elapsed timers are skipped on replay
    pub async fn sleep(&self, duration: Duration) -> Result<(), WorkflowError> {
        let seq = self.take_seq();

        let fire_at = match self.recorded.get(&seq) {
            Some(Recorded::Timer { fired: true, .. }) => return Ok(()),
            Some(Recorded::Timer { fire_at, .. }) => *fire_at,
            Some(other) => return Err(self.mismatch(seq, other, "timer")),
            None => {
                let now = self.journal.now();
                let fire_at = chrono::Duration::from_std(duration)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                self.journal.persist(Operation::TimerStarted {
                    run_id: self.run_id.clone(),
                    seq,
                    fire_at,
                })?;
                fire_at
            }
        };

        let remaining = (fire_at - self.journal.now()).to_std().unwrap_or_default();
        tokio::time::sleep(remaining).await;

        self.journal.persist(Operation::TimerFired {
            run_id: self.run_id.clone(),
            seq,
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
