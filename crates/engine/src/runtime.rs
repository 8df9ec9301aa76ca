// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable runtime: starts workflow runs and resumes them after a restart

use crate::activity::{ActivityExecutor, ActivityRunner};
use crate::context::WorkflowContext;
use crate::error::{RuntimeError, WorkflowError};
use crate::journal::{Compaction, Journal};
use crate::workflows::{Workflow, WorkflowRegistry};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sw_core::{
    Clock, IdGen, Operation, WorkflowInstance, WorkflowStatus, DEFAULT_EXECUTION_TIMEOUT,
};
use sw_storage::{MaterializedState, Wal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Runtime dependencies
pub struct RuntimeDeps {
    pub wal: Arc<Mutex<Wal>>,
    pub state: Arc<Mutex<MaterializedState>>,
    pub activities: Arc<dyn ActivityRunner>,
}

/// Request to start one run
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// Workflow definition name
    pub workflow: String,
    pub workflow_id: String,
    pub input: Value,
    pub schedule_id: Option<String>,
    pub execution_timeout: Duration,
}

impl StartRequest {
    /// A manual run, identified as `manual-<workflow>`
    pub fn manual(workflow: impl Into<String>, input: Value) -> Self {
        let workflow = workflow.into();
        Self {
            workflow_id: format!("manual-{workflow}"),
            workflow,
            input,
            schedule_id: None,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub struct RunCompletion {
    pub run_id: String,
    pub workflow_id: String,
    pub workflow: String,
    /// `Running` when the outcome could not be journaled
    pub status: WorkflowStatus,
    /// Result message or error text
    pub detail: String,
}

/// A run driven on its own task
pub struct RunHandle {
    pub run_id: String,
    join: JoinHandle<RunCompletion>,
}

impl RunHandle {
    /// Wait for the run to finish; `None` if its task panicked or was aborted
    pub async fn wait(self) -> Option<RunCompletion> {
        self.join.await.ok()
    }
}

/// Durable runtime that owns every workflow run
pub struct Runtime<C: Clock, I: IdGen> {
    journal: Journal,
    executor: ActivityExecutor,
    registry: WorkflowRegistry,
    clock: C,
    id_gen: I,
    completions: Option<mpsc::UnboundedSender<RunCompletion>>,
}

impl<C: Clock, I: IdGen> Runtime<C, I> {
    pub fn new(deps: RuntimeDeps, registry: WorkflowRegistry, clock: C, id_gen: I) -> Self {
        Self {
            journal: Journal::new(deps.wal, deps.state, clock.clone()),
            executor: ActivityExecutor::new(deps.activities),
            registry,
            clock,
            id_gen,
            completions: None,
        }
    }

    /// Report every finished run on `tx`
    pub fn with_completions(mut self, tx: mpsc::UnboundedSender<RunCompletion>) -> Self {
        self.completions = Some(tx);
        self
    }

    /// Compact the WAL into a snapshot as it grows
    pub fn with_compaction(mut self, compaction: Compaction) -> Self {
        self.journal = self.journal.with_compaction(compaction);
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Journal a new run and drive it on its own task
    pub fn start(&self, request: StartRequest) -> Result<RunHandle, RuntimeError> {
        let workflow = self
            .registry
            .get(&request.workflow)
            .ok_or_else(|| RuntimeError::WorkflowNotFound(request.workflow.clone()))?;

        let run_id = self.id_gen.next();
        self.journal.persist(Operation::WorkflowStarted {
            workflow_id: request.workflow_id.clone(),
            run_id: run_id.clone(),
            workflow: request.workflow.clone(),
            schedule_id: request.schedule_id.clone(),
            input: request.input,
            started_at: self.clock.utc_now(),
            execution_timeout: request.execution_timeout,
        })?;

        tracing::info!(
            run_id = %run_id,
            workflow = %request.workflow,
            workflow_id = %request.workflow_id,
            "workflow started"
        );

        let instance = self
            .journal
            .instance(&run_id)
            .ok_or_else(|| RuntimeError::RunNotFound(run_id.clone()))?;
        Ok(self.spawn(workflow, instance))
    }

    /// Resume every run left `Running` by a previous process
    ///
    /// Runs whose definition is gone are failed; runs past their deadline are
    /// timed out. Everything else replays its history and carries on.
    pub fn recover(&self) -> Result<Vec<RunHandle>, RuntimeError> {
        let running: Vec<WorkflowInstance> = self
            .journal
            .read(|state| state.running().into_iter().cloned().collect());
        let now = self.clock.utc_now();

        let mut handles = Vec::new();
        for instance in running {
            let Some(workflow) = self.registry.get(&instance.workflow) else {
                tracing::warn!(
                    run_id = %instance.run_id,
                    workflow = %instance.workflow,
                    "workflow no longer defined, failing run"
                );
                self.journal.persist(Operation::WorkflowFailed {
                    run_id: instance.run_id.clone(),
                    error: RuntimeError::WorkflowNotFound(instance.workflow.clone()).to_string(),
                    at: now,
                })?;
                continue;
            };

            if instance.deadline() <= now {
                tracing::warn!(run_id = %instance.run_id, "run exceeded its deadline while down");
                self.journal.persist(Operation::WorkflowTimedOut {
                    run_id: instance.run_id.clone(),
                    at: now,
                })?;
                continue;
            }

            tracing::info!(
                run_id = %instance.run_id,
                workflow = %instance.workflow,
                position = instance.position(),
                "resuming run"
            );
            handles.push(self.spawn(workflow, instance));
        }
        Ok(handles)
    }

    fn spawn(&self, workflow: Arc<dyn Workflow>, instance: WorkflowInstance) -> RunHandle {
        let span = tracing::info_span!(
            "workflow",
            workflow = %instance.workflow,
            run_id = %instance.run_id
        );
        let run_id = instance.run_id.clone();
        let journal = self.journal.clone();
        let executor = self.executor.clone();
        let completions = self.completions.clone();

        let join = tokio::spawn(
            async move {
                let completion = drive(journal, executor, workflow, instance).await;
                if let Some(tx) = completions {
                    // Receiver gone means nobody is listening any more
                    let _ = tx.send(completion.clone());
                }
                completion
            }
            .instrument(span),
        );
        RunHandle { run_id, join }
    }
}

/// Run `workflow` against `instance` until it finishes or its deadline passes
async fn drive(
    journal: Journal,
    executor: ActivityExecutor,
    workflow: Arc<dyn Workflow>,
    instance: WorkflowInstance,
) -> RunCompletion {
    let remaining = (instance.deadline() - journal.now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    let ctx = WorkflowContext::new(
        &instance.run_id,
        &instance.workflow_id,
        &instance.history,
        journal.clone(),
        executor,
    );

    let start = std::time::Instant::now();
    let outcome = tokio::time::timeout(remaining, workflow.run(&ctx, instance.input.clone())).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let at = journal.now();
    let run_id = instance.run_id.clone();

    let (op, status, detail) = match outcome {
        Ok(Ok(result)) => {
            tracing::info!(elapsed_ms, result = %result, "workflow completed");
            (
                Operation::WorkflowCompleted {
                    run_id,
                    result: result.clone(),
                    at,
                },
                WorkflowStatus::Completed,
                result,
            )
        }
        Ok(Err(WorkflowError::Storage(e))) => {
            // History is incomplete; leave the run for recovery
            tracing::error!(elapsed_ms, error = %e, "journal write failed, run left running");
            return RunCompletion {
                run_id,
                workflow_id: instance.workflow_id,
                workflow: instance.workflow,
                status: WorkflowStatus::Running,
                detail: e.to_string(),
            };
        }
        Ok(Err(e)) => {
            let error = e.to_string();
            tracing::error!(elapsed_ms, error = %error, "workflow failed");
            (
                Operation::WorkflowFailed {
                    run_id,
                    error: error.clone(),
                    at,
                },
                WorkflowStatus::Failed,
                error,
            )
        }
        Err(_) => {
            tracing::error!(
                elapsed_ms,
                timeout_secs = instance.execution_timeout.as_secs(),
                "workflow timed out"
            );
            (
                Operation::WorkflowTimedOut { run_id, at },
                WorkflowStatus::TimedOut,
                "execution timeout exceeded".to_string(),
            )
        }
    };

    let status = match journal.persist(op) {
        Ok(()) => status,
        Err(e) => {
            tracing::error!(error = %e, "failed to record workflow outcome");
            WorkflowStatus::Running
        }
    };

    RunCompletion {
        run_id: instance.run_id,
        workflow_id: instance.workflow_id,
        workflow: instance.workflow,
        status,
        detail,
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
