// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshots for WAL compaction
//!
//! A snapshot captures the materialized state together with the WAL sequence
//! it reflects. Recovery loads the snapshot and replays only the entries
//! written after it, so the log can be truncated once a snapshot is on disk.

use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use sw_core::{ScheduleSpec, WorkflowInstance};
use thiserror::Error;

/// Errors that can occur during snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("invalid snapshot format: {0}")]
    InvalidFormat(String),
}

/// Serializable copy of the materialized state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Last WAL sequence folded into this snapshot
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub instances: Vec<WorkflowInstance>,
    pub archived: Vec<WorkflowInstance>,
    pub schedules: Vec<ScheduleSpec>,
}

impl Snapshot {
    /// Current version of the snapshot format
    pub const CURRENT_VERSION: u32 = 1;

    pub fn from_state(state: &MaterializedState, sequence: u64, created_at: DateTime<Utc>) -> Self {
        let mut instances: Vec<_> = state.instances.values().cloned().collect();
        instances.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Self {
            version: Self::CURRENT_VERSION,
            sequence,
            created_at,
            instances,
            archived: state.archived.iter().cloned().collect(),
            schedules: state.schedules.values().cloned().collect(),
        }
    }

    pub fn into_state(self) -> MaterializedState {
        MaterializedState {
            instances: self
                .instances
                .into_iter()
                .map(|i| (i.run_id.clone(), i))
                .collect(),
            archived: self.archived.into(),
            schedules: self
                .schedules
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
        }
    }

    /// Write the snapshot, replacing any previous one atomically
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = tmp_path(path);
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read the snapshot at `path`, if one was written
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Self = serde_json::from_reader(BufReader::new(file))?;

        if snapshot.version != Self::CURRENT_VERSION {
            return Err(SnapshotError::InvalidFormat(format!(
                "unsupported version: {} (expected {})",
                snapshot.version,
                Self::CURRENT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Rebuild state from the snapshot plus the WAL entries written after it,
/// and open the WAL for appending
pub fn restore(
    wal_path: &Path,
    snapshot_path: &Path,
) -> Result<(MaterializedState, Wal), SnapshotError> {
    let snapshot = Snapshot::load(snapshot_path)?;
    let sequence = snapshot.as_ref().map_or(0, |s| s.sequence);
    let mut state = snapshot.map(Snapshot::into_state).unwrap_or_default();

    let ops = Wal::replay_after(wal_path, sequence)?;
    tracing::debug!(snapshot_sequence = sequence, replayed = ops.len(), "restoring state");
    for op in &ops {
        state.apply(op);
    }

    let mut wal = Wal::open(wal_path)?;
    wal.advance_to(sequence);
    Ok((state, wal))
}

/// Snapshot `state` at the WAL's current sequence, then truncate the WAL
///
/// A crash between the two steps leaves entries the snapshot already covers;
/// [`restore`] skips them by sequence.
pub fn compact(
    wal: &mut Wal,
    state: &MaterializedState,
    snapshot_path: &Path,
    now: DateTime<Utc>,
) -> Result<(), SnapshotError> {
    let entries = wal.entries();
    Snapshot::from_state(state, wal.sequence(), now).save(snapshot_path)?;
    wal.truncate()?;
    tracing::info!(sequence = wal.sequence(), entries, "compacted WAL into snapshot");
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
