// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity execution
//!
//! [`Activities`] turns an [`Activity`] into adapter calls. [`ActivityExecutor`]
//! wraps one invocation in the runtime's policies: start-to-close timeout,
//! heartbeat watchdog and retries.

use crate::spawn::SpawnClient;
use async_trait::async_trait;
use chrono::Datelike;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use sw_adapters::{GatewayAdapter, NotifyAdapter, ShellAdapter, ShellError, UptimeAdapter};
use sw_core::limits::{truncate_chars, MAX_ERROR_CHARS, MAX_OUTPUT_CHARS};
use sw_core::{
    Activity, ActivityError, ActivityOptions, ActivityOutcome, ClockReading, Clock, ScriptOutput,
};
use sw_storage::StateStore;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::Instrument;

/// Liveness signal handed to a running activity
#[derive(Clone)]
pub struct Heartbeat {
    tx: Arc<watch::Sender<Instant>>,
    on_beat: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Heartbeat {
    /// A heartbeat and the receiver a watchdog listens on
    pub fn channel() -> (Self, watch::Receiver<Instant>) {
        let (tx, rx) = watch::channel(Instant::now());
        (
            Self {
                tx: Arc::new(tx),
                on_beat: None,
            },
            rx,
        )
    }

    /// A heartbeat nobody listens to
    pub fn detached() -> Self {
        Self::channel().0
    }

    /// Also call `f` on every beat
    pub fn with_callback(mut self, f: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.on_beat = Some(f);
        self
    }

    pub fn beat(&self) {
        self.tx.send_replace(Instant::now());
        if let Some(on_beat) = &self.on_beat {
            on_beat();
        }
    }
}

/// Runs a single activity attempt
#[async_trait]
pub trait ActivityRunner: Send + Sync + 'static {
    async fn run(&self, activity: &Activity, heartbeat: &Heartbeat) -> ActivityOutcome;
}

/// Settings for the concrete activity implementations
#[derive(Debug, Clone)]
pub struct ActivitySettings {
    /// Timezone for `read_clock`
    pub timezone: Tz,
    /// Chat target used when a notification names none
    pub notify_target: String,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Budapest,
            notify_target: String::new(),
        }
    }
}

/// Activity implementations backed by adapters
pub struct Activities<G, N, U, S, C> {
    spawn: SpawnClient<G>,
    notify: N,
    uptime: U,
    shell: S,
    clock: C,
    settings: ActivitySettings,
}

impl<G, N, U, S, C> Activities<G, N, U, S, C>
where
    G: GatewayAdapter,
    N: NotifyAdapter,
    U: UptimeAdapter,
    S: ShellAdapter,
    C: Clock,
{
    pub fn new(
        spawn: SpawnClient<G>,
        notify: N,
        uptime: U,
        shell: S,
        clock: C,
        settings: ActivitySettings,
    ) -> Self {
        Self {
            spawn,
            notify,
            uptime,
            shell,
            clock,
            settings,
        }
    }

    async fn run_script(&self, command: &str, timeout: Duration) -> Result<ScriptOutput, ActivityError> {
        let output = match self.shell.run(command, timeout).await {
            Ok(output) => output,
            Err(ShellError::Timeout(_)) => {
                return Err(ActivityError::timeout(
                    format!("Timed out after {}s", timeout.as_secs()),
                    None,
                ))
            }
            Err(ShellError::Spawn(e)) => return Err(ActivityError::transport(e)),
        };

        if !output.is_success() {
            let stderr = output.stderr.trim();
            let stderr = if stderr.is_empty() {
                format!("Exit code {}", output.exit_code)
            } else {
                truncate_chars(stderr, MAX_ERROR_CHARS)
            };
            return Err(ActivityError::NonZeroExit {
                code: output.exit_code,
                stderr,
            });
        }

        Ok(ScriptOutput {
            output: truncate_chars(output.stdout.trim(), MAX_OUTPUT_CHARS),
            exit_code: 0,
        })
    }

    async fn notify(&self, message: &str, target: Option<&str>) {
        let target = target.unwrap_or(&self.settings.notify_target);
        if target.is_empty() {
            tracing::info!(message, "no notification target configured");
            return;
        }
        // Best-effort: a lost notification never changes the workflow outcome
        if let Err(e) = self.notify.send(target, message).await {
            tracing::warn!(recipient = target, error = %e, "notification failed");
        }
    }

    async fn ping(&self, key: &str) -> bool {
        match self.uptime.ping(key).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(key, "no uptime monitor registered");
                false
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "uptime ping failed");
                false
            }
        }
    }

    fn read_clock(&self) -> ClockReading {
        let utc = self.clock.utc_now();
        let local = utc.with_timezone(&self.settings.timezone);
        ClockReading {
            utc,
            local: local.fixed_offset(),
            weekday: local.weekday().num_days_from_monday(),
        }
    }
}

#[async_trait]
impl<G, N, U, S, C> ActivityRunner for Activities<G, N, U, S, C>
where
    G: GatewayAdapter,
    N: NotifyAdapter,
    U: UptimeAdapter,
    S: ShellAdapter,
    C: Clock,
{
    async fn run(&self, activity: &Activity, heartbeat: &Heartbeat) -> ActivityOutcome {
        match activity {
            Activity::SpawnAgent {
                task,
                agent,
                timeout,
            } => to_value(self.spawn.spawn(task, agent, *timeout, heartbeat).await?),
            Activity::DelegateAgent {
                task,
                agent,
                timeout,
            } => to_value(self.spawn.submit(task, agent, *timeout, heartbeat).await?),
            Activity::RunScript { command, timeout } => {
                to_value(self.run_script(command, *timeout).await?)
            }
            Activity::Notify { message, target } => {
                self.notify(message, target.as_deref()).await;
                Ok(Value::Null)
            }
            Activity::PingUptime { key } => Ok(Value::Bool(self.ping(key).await)),
            Activity::ReadClock => to_value(self.read_clock()),
            Activity::LoadState { path } => {
                let path = path.clone();
                blocking(move || StateStore::load(&path)).await
            }
            Activity::SaveState { path, data } => {
                let (path, data) = (path.clone(), data.clone());
                blocking(move || StateStore::save(&path, &data).map(|()| Value::Null)).await
            }
        }
    }
}

fn to_value(output: impl Serialize) -> ActivityOutcome {
    serde_json::to_value(output).map_err(|e| ActivityError::InvalidInput(e.to_string()))
}

async fn blocking<F, E>(f: F) -> ActivityOutcome
where
    F: FnOnce() -> Result<Value, E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| ActivityError::Io(e.to_string())),
        Err(e) => Err(ActivityError::Io(e.to_string())),
    }
}

/// Runs activities under their execution options
#[derive(Clone)]
pub struct ActivityExecutor {
    runner: Arc<dyn ActivityRunner>,
}

impl ActivityExecutor {
    pub fn new(runner: Arc<dyn ActivityRunner>) -> Self {
        Self { runner }
    }

    /// Execute with retries; `on_beat` is called for every heartbeat
    pub async fn execute(
        &self,
        activity: &Activity,
        options: &ActivityOptions,
        on_beat: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> ActivityOutcome {
        let span = tracing::info_span!("activity", kind = activity.kind());
        self.execute_with_retry(activity, options, on_beat)
            .instrument(span)
            .await
    }

    async fn execute_with_retry(
        &self,
        activity: &Activity,
        options: &ActivityOptions,
        on_beat: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> ActivityOutcome {
        tracing::info!(fields = ?activity.fields(), "executing");

        let mut attempt = 1;
        loop {
            let start = std::time::Instant::now();
            let outcome = self.attempt(activity, options, on_beat.clone()).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &outcome {
                Ok(_) => tracing::info!(elapsed_ms, attempt, "completed"),
                Err(e) => tracing::warn!(elapsed_ms, attempt, error = %e, "failed"),
            }

            match outcome {
                Err(e) if options.retry.should_retry(attempt, &e) => {
                    let delay = options.retry.delay_after(attempt);
                    tracing::info!(delay_ms = delay.as_millis() as u64, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn attempt(
        &self,
        activity: &Activity,
        options: &ActivityOptions,
        on_beat: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> ActivityOutcome {
        let (mut heartbeat, rx) = Heartbeat::channel();
        if let Some(on_beat) = on_beat {
            heartbeat = heartbeat.with_callback(on_beat);
        }

        let guarded = async {
            match options.heartbeat_timeout {
                Some(limit) => {
                    tokio::select! {
                        outcome = self.runner.run(activity, &heartbeat) => outcome,
                        () = watchdog(rx, limit) => Err(ActivityError::HeartbeatTimeout(limit.as_secs())),
                    }
                }
                None => self.runner.run(activity, &heartbeat).await,
            }
        };

        match tokio::time::timeout(options.start_to_close, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ActivityError::timeout(
                format!(
                    "Activity exceeded start-to-close timeout of {}s",
                    options.start_to_close.as_secs()
                ),
                None,
            )),
        }
    }
}

/// Resolves once no heartbeat arrived for `limit`
async fn watchdog(mut rx: watch::Receiver<Instant>, limit: Duration) {
    loop {
        let deadline = *rx.borrow_and_update() + limit;
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    // Sender gone: the activity finished
                    std::future::pending::<()>().await;
                }
            }
            () = tokio::time::sleep_until(deadline) => return,
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
