// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine unit tests

use crate::activity::{Activities, ActivityExecutor, ActivityRunner, ActivitySettings};
use crate::context::WorkflowContext;
use crate::journal::Journal;
use crate::spawn::{SpawnClient, SpawnConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sw_adapters::{
    FakeGateway, FakeNotifyAdapter, FakeShell, FakeUptimeAdapter, GatewayError, GatewayResponse,
};
use sw_core::{Clock, FakeClock, HistoryEvent, Operation};
use sw_storage::{MaterializedState, Wal};
use tempfile::TempDir;

pub(crate) struct TestEnv {
    pub dir: TempDir,
    pub wal: Arc<Mutex<Wal>>,
    pub state: Arc<Mutex<MaterializedState>>,
    pub gateway: FakeGateway,
    pub notify: FakeNotifyAdapter,
    pub uptime: FakeUptimeAdapter,
    pub shell: FakeShell,
    pub clock: FakeClock,
    pub journal: Journal,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let wal = Arc::new(Mutex::new(Wal::open(&dir.path().join("wal.jsonl")).unwrap()));
        let state = Arc::new(Mutex::new(MaterializedState::default()));
        let clock = FakeClock::new();
        let journal = Journal::new(wal.clone(), state.clone(), clock.clone());
        Self {
            dir,
            wal,
            state,
            gateway: FakeGateway::new(),
            notify: FakeNotifyAdapter::new(),
            uptime: FakeUptimeAdapter::new(),
            shell: FakeShell::new(),
            clock,
            journal,
        }
    }

    pub fn activities(&self) -> Arc<dyn ActivityRunner> {
        Arc::new(Activities::new(
            SpawnClient::new(self.gateway.clone(), SpawnConfig::default()),
            self.notify.clone(),
            self.uptime.clone(),
            self.shell.clone(),
            self.clock.clone(),
            ActivitySettings {
                timezone: chrono_tz::Europe::Budapest,
                notify_target: "C-LOGS".to_string(),
            },
        ))
    }

    pub fn executor(&self) -> ActivityExecutor {
        ActivityExecutor::new(self.activities())
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Journal a running instance for `run_id`
    pub fn start_run(&self, run_id: &str, workflow: &str) {
        self.journal
            .persist(Operation::WorkflowStarted {
                workflow_id: workflow.to_string(),
                run_id: run_id.to_string(),
                workflow: workflow.to_string(),
                schedule_id: None,
                input: Value::Null,
                started_at: self.clock.utc_now(),
                execution_timeout: Duration::from_secs(7200),
            })
            .unwrap();
    }

    /// Fresh context replaying whatever history `run_id` has so far
    pub fn context(&self, run_id: &str) -> WorkflowContext {
        WorkflowContext::new(
            run_id,
            run_id,
            &self.history(run_id),
            self.journal.clone(),
            self.executor(),
        )
    }

    pub fn history(&self, run_id: &str) -> Vec<HistoryEvent> {
        self.journal
            .instance(run_id)
            .map(|i| i.history)
            .unwrap_or_default()
    }

    /// Materialized state rebuilt from the WAL, as after a restart
    pub fn replayed_state(&self) -> MaterializedState {
        let mut state = MaterializedState::default();
        for op in Wal::replay(&self.path("wal.jsonl")).unwrap() {
            state.apply(&op);
        }
        state
    }

    /// Queue an inline spawn answer
    pub fn answer_inline(&self, summary: &str) {
        self.gateway.push("sessions_spawn", inline(summary));
    }

    /// Queue a spawn refusal
    pub fn refuse_spawn(&self, error: &str) {
        self.gateway
            .push("sessions_spawn", Ok(GatewayResponse::err(error)));
    }
}

pub(crate) fn inline(summary: &str) -> Result<GatewayResponse, GatewayError> {
    Ok(GatewayResponse::ok(
        json!({"details": {"summary": summary}}),
    ))
}

pub(crate) fn session(key: &str) -> Result<GatewayResponse, GatewayError> {
    Ok(GatewayResponse::ok(
        json!({"details": {"childSessionKey": key}}),
    ))
}
