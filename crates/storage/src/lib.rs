// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-storage: durable persistence for the steward runtime

mod snapshot;
mod state;
mod state_file;
mod wal;

pub use snapshot::{compact, restore, Snapshot, SnapshotError};
pub use state::{MaterializedState, ARCHIVE_LIMIT};
pub use state_file::{StateFileError, StateStore};
pub use wal::{Wal, WalError};
