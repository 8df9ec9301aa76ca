// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable journal: WAL append followed by in-memory apply

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use sw_core::{Clock, Operation, WorkflowInstance};
use sw_storage::{MaterializedState, SnapshotError, Wal, WalError};

/// WAL entries accumulated before the journal compacts itself
pub const DEFAULT_COMPACT_AFTER: u64 = 10_000;

/// Where and how often the WAL is folded into a snapshot
#[derive(Debug, Clone)]
pub struct Compaction {
    pub snapshot_path: PathBuf,
    pub after_entries: u64,
}

/// Handle for persisting operations, cheap to clone
#[derive(Clone)]
pub struct Journal {
    wal: Arc<Mutex<Wal>>,
    state: Arc<Mutex<MaterializedState>>,
    now: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    compaction: Option<Arc<Compaction>>,
}

impl Journal {
    pub fn new<C: Clock>(
        wal: Arc<Mutex<Wal>>,
        state: Arc<Mutex<MaterializedState>>,
        clock: C,
    ) -> Self {
        Self {
            wal,
            state,
            now: Arc::new(move || clock.utc_now()),
            compaction: None,
        }
    }

    /// Snapshot and truncate the WAL once it holds `after_entries` entries
    pub fn with_compaction(mut self, compaction: Compaction) -> Self {
        self.compaction = Some(Arc::new(compaction));
        self
    }

    /// Append `op` to the WAL, then apply it to the materialized state
    ///
    /// The WAL lock is held across the apply so both see the same order.
    pub fn persist(&self, op: Operation) -> Result<(), WalError> {
        let mut wal = self.wal.lock().unwrap_or_else(|e| e.into_inner());
        wal.append(&op)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.apply(&op);

        if let Some(compaction) = &self.compaction {
            if wal.entries() >= compaction.after_entries {
                // The operation is already durable; a failed compaction is retried next time
                if let Err(e) =
                    sw_storage::compact(&mut wal, &state, &compaction.snapshot_path, self.now())
                {
                    tracing::warn!(error = %e, "WAL compaction failed");
                }
            }
        }
        Ok(())
    }

    /// Fold the WAL into a snapshot now
    ///
    /// Does nothing when no compaction is configured or the WAL is empty.
    pub fn compact(&self) -> Result<(), SnapshotError> {
        let Some(compaction) = &self.compaction else {
            return Ok(());
        };
        let mut wal = self.wal.lock().unwrap_or_else(|e| e.into_inner());
        if wal.entries() == 0 {
            return Ok(());
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        sw_storage::compact(&mut wal, &state, &compaction.snapshot_path, self.now())
    }

    /// Wall-clock time used for journaled timestamps
    pub fn now(&self) -> DateTime<Utc> {
        (self.now)()
    }

    pub fn instance(&self, run_id: &str) -> Option<WorkflowInstance> {
        self.read(|state| state.instances.get(run_id).cloned())
    }

    /// Run `f` against the materialized state
    pub fn read<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        f(&self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
