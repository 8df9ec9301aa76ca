// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use tokio::net::UnixStream;
use tracing::{debug, error};

use crate::lifecycle::DaemonState;
use crate::protocol::{
    self, Request, Response, RunSummary, ScheduleSummary, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
use sw_core::{TriggerRule, WorkflowInstance};

/// Finished runs included in `ListRuns`, newest first
const RECENT_RUNS: usize = 50;

/// Handle a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Failed to read request");
            return Err(ServerError::Protocol(e));
        }
    };

    debug!(?request, "received request");
    let response = handle_request(daemon, request);
    debug!(?response, "sending response");

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub fn handle_request(daemon: &mut DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let runs_active = daemon
                .state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .running()
                .len();
            Response::Status {
                uptime_secs: daemon.start_time.elapsed().as_secs(),
                runs_active,
                schedules: daemon.scheduler.schedules().len(),
            }
        }

        Request::ListSchedules => {
            let schedules = daemon
                .scheduler
                .schedules()
                .into_iter()
                .map(|spec| ScheduleSummary {
                    next_fire: daemon.scheduler.next_fire(&spec.id),
                    trigger: describe(&spec.trigger),
                    id: spec.id,
                    workflow: spec.workflow,
                })
                .collect();
            Response::Schedules { schedules }
        }

        Request::ListRuns => {
            let state = daemon.state.lock().unwrap_or_else(|e| e.into_inner());
            let runs = state
                .running()
                .into_iter()
                .chain(state.archived.iter().rev().take(RECENT_RUNS))
                .map(summarize)
                .collect();
            Response::Runs { runs }
        }

        Request::GetRun { run_id } => {
            let state = daemon.state.lock().unwrap_or_else(|e| e.into_inner());
            match state.get_instance(&run_id) {
                Some(instance) => Response::Run {
                    run: summarize(instance),
                },
                None => Response::Error {
                    message: format!("no single run matches '{run_id}'"),
                },
            }
        }

        Request::Trigger { workflow, input } => match daemon.trigger(&workflow, input) {
            Ok(run_id) => Response::Triggered { run_id },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Shutdown => {
            daemon.shutdown_requested = true;
            Response::ShuttingDown
        }
    }
}

fn summarize(instance: &WorkflowInstance) -> RunSummary {
    RunSummary {
        run_id: instance.run_id.clone(),
        workflow_id: instance.workflow_id.clone(),
        workflow: instance.workflow.clone(),
        status: instance.status.to_string(),
        started_at: instance.started_at,
        finished_at: instance.finished_at,
        detail: instance.result.clone().or_else(|| instance.error.clone()),
    }
}

/// Human-readable trigger rule
fn describe(rule: &TriggerRule) -> String {
    match rule {
        TriggerRule::Cron { expressions } => expressions
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        TriggerRule::Interval { every } => {
            format!("every {}", humantime::format_duration(*every))
        }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
