// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity failure taxonomy

use crate::limits::{truncate_chars, MAX_ERROR_CHARS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed failure of a single activity
///
/// Recorded verbatim in workflow history, so every variant is serializable
/// and every message is already bounded in size.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ActivityError {
    /// Network failure or subprocess launch error
    #[error("{0}")]
    Transport(String),

    /// The remote side answered with an explicit failure
    #[error("{0}")]
    Rejected(String),

    /// A subprocess exited with a non-zero code
    #[error("{stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// A deadline expired; the session key is kept for diagnosis
    #[error("{message}")]
    Timeout {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_key: Option<String>,
    },

    /// The activity stopped heartbeating and was cancelled
    #[error("no heartbeat for {0}s, activity cancelled")]
    HeartbeatTimeout(u64),

    /// A remote response could not be decoded
    #[error("{message}: {body}")]
    Parse { message: String, body: String },

    /// Local file I/O failed
    #[error("io error: {0}")]
    Io(String),

    /// The invocation itself was malformed
    #[error("invalid activity input: {0}")]
    InvalidInput(String),
}

impl ActivityError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(truncate_chars(&message.into(), MAX_ERROR_CHARS))
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(truncate_chars(&message.into(), MAX_ERROR_CHARS))
    }

    pub fn timeout(message: impl Into<String>, session_key: Option<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            session_key,
        }
    }

    /// Parse failure carrying a truncated copy of the offending body
    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        Self::Parse {
            message: message.into(),
            body: truncate_chars(body, MAX_ERROR_CHARS),
        }
    }

    /// Transport-level and deadline failures may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::HeartbeatTimeout(_) | Self::Io(_)
        )
    }

    /// Session handle attached to a timeout, if any
    pub fn session_key(&self) -> Option<&str> {
        match self {
            Self::Timeout { session_key, .. } => session_key.as_deref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ActivityError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
