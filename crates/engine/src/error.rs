// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use sw_storage::WalError;
use thiserror::Error;

/// Errors that end a workflow run
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow itself decided the run failed
    #[error("{0}")]
    Failed(String),

    /// Replayed history does not match what the workflow code asked for
    #[error("non-deterministic replay of {run_id} at seq {seq}: recorded {recorded}, requested {requested}")]
    NonDeterministic {
        run_id: String,
        seq: u32,
        recorded: String,
        requested: String,
    },

    /// A recorded activity output did not decode into the expected type
    #[error("cannot decode {kind} output: {message}")]
    Decode { kind: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] WalError),
}

impl WorkflowError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("storage error: {0}")]
    Storage(#[from] WalError),
}
