// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal client for the control socket

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::net::UnixStream;

use crate::protocol::{self, ProtocolError, Request, Response, RunSummary, DEFAULT_TIMEOUT};

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,
}

/// Talks to a running daemon over its socket
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                    ClientError::DaemonNotRunning
                }
                _ => ClientError::Protocol(e.into()),
            }
        })?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(request)?;
        tokio::time::timeout(self.timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let bytes = tokio::time::timeout(self.timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(protocol::decode(&bytes)?)
    }

    /// Start `workflow` now and return its run id
    pub async fn trigger(
        &self,
        workflow: &str,
        input: serde_json::Value,
    ) -> Result<String, ClientError> {
        let request = Request::Trigger {
            workflow: workflow.to_string(),
            input,
        };
        match self.send(&request).await? {
            Response::Triggered { run_id } => Ok(run_id),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Look up one run by id or unique id prefix
    pub async fn get_run(&self, run_id: &str) -> Result<RunSummary, ClientError> {
        let request = Request::GetRun {
            run_id: run_id.to_string(),
        };
        match self.send(&request).await? {
            Response::Run { run } => Ok(run),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
