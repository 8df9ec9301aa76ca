// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use fs2::FileExt;
use serde_json::Value;
use sw_adapters::{
    GatewayNotifier, HttpGateway, HttpUptime, NoOpNotifyAdapter,
    NoOpUptimeAdapter, NotifyAdapter, SystemShell, TracedGateway, TracedShell, UptimeAdapter,
};
use sw_core::{Clock, SystemClock, UuidIdGen, WorkflowStatus};
use sw_engine::{
    Activities, ActivityRunner, Compaction, RunCompletion, Runtime, RuntimeDeps, Scheduler,
    SpawnClient, StartRequest, WorkflowRegistry,
};
use sw_runbook::load_runbook;
use sw_storage::MaterializedState;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;

/// Daemon runtime with concrete clock and id types
pub type DaemonRuntime = Runtime<SystemClock, UuidIdGen>;

type Gateway = TracedGateway<HttpGateway>;

/// Longest the main loop sleeps between schedule checks
pub const MAX_TICK: Duration = Duration::from_secs(60);

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    /// Materialized state (shared with runtime)
    pub state: Arc<Mutex<MaterializedState>>,
    pub runtime: DaemonRuntime,
    pub scheduler: Scheduler,
    /// Finished runs, reported by the runtime
    pub completions: mpsc::UnboundedReceiver<RunCompletion>,
    pub start_time: Instant,
    pub shutdown_requested: bool,
}

impl DaemonState {
    /// Start every schedule that is due
    pub fn tick(&mut self) {
        let now = SystemClock.utc_now();
        for trigger in self.scheduler.due(now) {
            let schedule_id = trigger.schedule_id.clone();
            match self.runtime.start(trigger.into_request()) {
                Ok(handle) => {
                    info!(schedule_id = %schedule_id, run_id = %handle.run_id, "scheduled run started")
                }
                Err(e) => warn!(schedule_id = %schedule_id, error = %e, "failed to start scheduled run"),
            }
        }
    }

    /// How long the main loop may sleep before a schedule is due
    pub fn until_next_fire(&self) -> Duration {
        wait_until(self.scheduler.next_deadline(), SystemClock.utc_now())
    }

    /// Start `workflow` now; manual runs bypass the overlap guard
    pub fn trigger(&mut self, workflow: &str, input: Value) -> Result<String, LifecycleError> {
        let request = StartRequest {
            execution_timeout: self.config.daemon.execution_timeout,
            ..StartRequest::manual(workflow, input)
        };
        let handle = self
            .runtime
            .start(request)
            .map_err(|e| LifecycleError::Runtime(e.to_string()))?;
        info!(workflow, run_id = %handle.run_id, "manual run started");
        Ok(handle.run_id)
    }

    /// Log a finished run
    pub fn record_completion(&self, completion: &RunCompletion) {
        match completion.status {
            WorkflowStatus::Completed => info!(
                run_id = %completion.run_id,
                workflow = %completion.workflow,
                result = %completion.detail,
                "run completed"
            ),
            WorkflowStatus::Running => warn!(
                run_id = %completion.run_id,
                workflow = %completion.workflow,
                error = %completion.detail,
                "run stopped without a recorded outcome, will resume on restart"
            ),
            status => warn!(
                run_id = %completion.run_id,
                workflow = %completion.workflow,
                %status,
                error = %completion.detail,
                "run did not complete"
            ),
        }
    }

    /// Shutdown the daemon gracefully
    ///
    /// Runs still in flight stay `Running` in the WAL and resume on the next
    /// start.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        if let Err(e) = self.runtime.journal().compact() {
            warn!(error = %e, "failed to compact WAL on shutdown");
        }

        for path in [
            self.config.socket_path(),
            self.config.lock_path(),
            self.config.version_path(),
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove file");
                }
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] sw_storage::WalError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] sw_storage::SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runbook parse error: {0}")]
    Runbook(#[from] sw_runbook::ParseError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(LifecycleError::LockFailed(e)) => Err(LifecycleError::LockFailed(e)),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. State directory, then the lock before anything else touches it
    std::fs::create_dir_all(&config.daemon.state_dir)?;
    // Opened without truncating so a losing start leaves the owner's PID intact
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(config.lock_path())?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    {
        use std::io::Write;
        writeln!(lock_file, "{}", std::process::id())?;
    }

    let wal_path = config.wal_path();
    if let Some(parent) = wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config.version_path(), env!("CARGO_PKG_VERSION"))?;

    // 2. Runbook before binding the socket: an invalid runbook never accepts clients
    let runbook = load_runbook(&config.daemon.runbook)?;
    info!(
        runbook = %config.daemon.runbook.display(),
        workflows = runbook.workflows.len(),
        schedules = runbook.schedules.len(),
        "loaded runbook"
    );

    // 3. State from the snapshot plus the WAL written after it
    let (state, wal) = sw_storage::restore(&wal_path, &config.snapshot_path())?;
    info!(
        running = state.running().len(),
        archived = state.archived.len(),
        schedules = state.schedules.len(),
        "loaded state"
    );

    // 4. Adapters and runtime
    let state = Arc::new(Mutex::new(state));
    let (completions_tx, completions) = mpsc::unbounded_channel();
    let runtime = Runtime::new(
        RuntimeDeps {
            wal: Arc::new(Mutex::new(wal)),
            state: Arc::clone(&state),
            activities: activities(config),
        },
        WorkflowRegistry::from_runbook(&runbook),
        SystemClock,
        UuidIdGen,
    )
    .with_completions(completions_tx)
    .with_compaction(Compaction {
        snapshot_path: config.snapshot_path(),
        after_entries: config.daemon.compact_after,
    });

    // 5. Resume interrupted runs, then make schedules match the runbook
    let resumed = runtime
        .recover()
        .map_err(|e| LifecycleError::Runtime(e.to_string()))?;
    if !resumed.is_empty() {
        info!(count = resumed.len(), "resumed interrupted runs");
    }
    let mut scheduler = Scheduler::new(runtime.journal().clone());
    scheduler.sync(&runbook.schedule_specs())?;
    runtime.journal().compact()?;

    // 6. Bind the socket last
    let socket_path = config.socket_path();
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let listener = UnixListener::bind(&socket_path)
        .map_err(|e| LifecycleError::BindFailed(socket_path.clone(), e))?;

    info!(state_dir = %config.daemon.state_dir.display(), "daemon started");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        state,
        runtime,
        scheduler,
        completions,
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

/// Activity implementations over real adapters
///
/// Without a `[notify]` section notifications are dropped; without an
/// `[uptime]` section pings report "no monitor".
fn activities(config: &Config) -> Arc<dyn ActivityRunner> {
    let gateway = TracedGateway::new(HttpGateway::new(config.gateway_config()));
    let notifier = config
        .notify
        .as_ref()
        .map(|_| GatewayNotifier::new(gateway.clone()));
    let uptime = config.uptime.clone().map(HttpUptime::new);

    match (notifier, uptime) {
        (Some(notify), Some(uptime)) => build(config, gateway, notify, uptime),
        (Some(notify), None) => build(config, gateway, notify, NoOpUptimeAdapter),
        (None, Some(uptime)) => build(config, gateway, NoOpNotifyAdapter::new(), uptime),
        (None, None) => build(config, gateway, NoOpNotifyAdapter::new(), NoOpUptimeAdapter),
    }
}

fn build<N, U>(config: &Config, gateway: Gateway, notify: N, uptime: U) -> Arc<dyn ActivityRunner>
where
    N: NotifyAdapter,
    U: UptimeAdapter,
{
    Arc::new(Activities::new(
        SpawnClient::new(gateway, config.spawn_config()),
        notify,
        uptime,
        TracedShell::new(SystemShell::new()),
        SystemClock,
        config.activity_settings(),
    ))
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    for path in [
        config.socket_path(),
        config.version_path(),
        config.lock_path(),
    ] {
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
    }
}

/// Time from `now` to `deadline`, capped at [`MAX_TICK`]
fn wait_until(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    deadline
        .map_or(MAX_TICK, |at| (at - now).to_std().unwrap_or(Duration::ZERO))
        .min(MAX_TICK)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
