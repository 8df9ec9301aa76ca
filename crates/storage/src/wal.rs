// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! One JSON object per line, each carrying a sequence number and a CRC32 of
//! the serialized operation. Replay stops at the first line that is torn or
//! fails its checksum; opening the log for writing cuts the file back to the
//! last good entry so new appends never land after garbage.
//!
//! After a snapshot the log is truncated; the sequence counter keeps counting
//! from the snapshot so entries written afterwards sort after it.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use sw_core::Operation;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
    /// Entries currently in the file
    entries: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let scan = scan(path)?;
        let len = file.metadata()?.len();
        if scan.valid_bytes < len {
            tracing::warn!(
                path = %path.display(),
                valid_bytes = scan.valid_bytes,
                file_bytes = len,
                "truncating WAL after last valid entry"
            );
            file.set_len(scan.valid_bytes)?;
            file.sync_all()?;
        }

        Ok(Self {
            file,
            sequence: scan.last_seq,
            entries: scan.ops.len() as u64,
        })
    }

    /// Append an operation to the log
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        self.sequence += 1;
        let entry = WalEntry::new(self.sequence, op.clone())?;
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{}", line)?;
        self.file.sync_all()?;
        self.entries += 1;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of entries in the file since it was last truncated
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Never hand out a sequence number at or below `sequence`
    pub fn advance_to(&mut self, sequence: u64) {
        self.sequence = self.sequence.max(sequence);
    }

    /// Drop every entry; the sequence counter is kept
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.entries = 0;
        Ok(())
    }

    /// Replay all valid operations from the log
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        Self::replay_after(path, 0)
    }

    /// Replay the operations with a sequence number above `sequence`
    pub fn replay_after(path: &Path, sequence: u64) -> Result<Vec<Operation>, WalError> {
        Ok(scan(path)?
            .ops
            .into_iter()
            .filter(|(seq, _)| *seq > sequence)
            .map(|(_, op)| op)
            .collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
    crc: u32,
}

impl WalEntry {
    fn new(seq: u64, op: Operation) -> Result<Self, WalError> {
        let crc = checksum(&op)?;
        Ok(Self { seq, op, crc })
    }

    fn verify(&self) -> bool {
        checksum(&self.op).is_ok_and(|crc| crc == self.crc)
    }
}

fn checksum(op: &Operation) -> Result<u32, WalError> {
    let json = serde_json::to_string(op)?;
    Ok(crc32fast::hash(json.as_bytes()))
}

struct Scan {
    ops: Vec<(u64, Operation)>,
    last_seq: u64,
    valid_bytes: u64,
}

fn scan(path: &Path) -> Result<Scan, WalError> {
    let mut result = Scan {
        ops: Vec::new(),
        last_seq: 0,
        valid_bytes: 0,
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(result),
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        // A line without its newline was cut short by a crash
        if !line.ends_with('\n') {
            tracing::warn!(path = %path.display(), "torn WAL entry at end of file");
            break;
        }
        let text = line.trim_end();
        if text.is_empty() {
            result.valid_bytes += read as u64;
            continue;
        }
        let entry = match serde_json::from_str::<WalEntry>(text) {
            Ok(entry) if entry.verify() => entry,
            Ok(entry) => {
                tracing::warn!(seq = entry.seq, "WAL checksum mismatch, stopping replay");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable WAL entry, stopping replay");
                break;
            }
        };
        result.last_seq = entry.seq;
        result.ops.push((entry.seq, entry.op));
        result.valid_bytes += read as u64;
    }

    Ok(result)
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
