// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steward Daemon (swd)
//!
//! Runs scheduled workflows in the foreground, or talks to a running daemon.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sw_daemon::client::DaemonClient;
use sw_daemon::{lifecycle, server, Config, LifecycleError, Request, Response};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "swd", version, about = "Steward - durable scheduled workflows")]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = "steward.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground (default)
    Run,
    /// Start a workflow now on a running daemon
    Trigger {
        workflow: String,
        /// JSON input passed to the workflow
        #[arg(long)]
        input: Option<String>,
    },
    /// Show schedules and recent runs
    Status,
    /// Show one run by id or unique id prefix
    Show { run: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config).await,
        Commands::Trigger { workflow, input } => {
            let config = Config::load(&cli.config)?;
            let input = match input {
                Some(text) => serde_json::from_str(&text)?,
                None => serde_json::Value::Null,
            };
            let run_id = DaemonClient::new(config.socket_path())
                .trigger(&workflow, input)
                .await?;
            println!("{run_id}");
            Ok(())
        }
        Commands::Status => {
            let config = Config::load(&cli.config)?;
            print_status(&DaemonClient::new(config.socket_path())).await
        }
        Commands::Show { run } => {
            let config = Config::load(&cli.config)?;
            let run = DaemonClient::new(config.socket_path()).get_run(&run).await?;
            println!("run       {}", run.run_id);
            println!("workflow  {} ({})", run.workflow, run.workflow_id);
            println!("status    {}", run.status);
            println!("started   {}", run.started_at.to_rfc3339());
            if let Some(finished) = run.finished_at {
                println!("finished  {}", finished.to_rfc3339());
            }
            if let Some(detail) = run.detail {
                println!("\n{detail}");
            }
            Ok(())
        }
    }
}

async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;

    // Startup marker goes in before tracing so it precedes everything else
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!(config = %config_path.display(), "Starting swd");

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path().display(), "Daemon ready");
    println!("READY");

    loop {
        let next_fire = daemon.until_next_fire();
        tokio::select! {
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        if let Err(e) = server::handle_connection(&mut daemon, stream).await {
                            error!("Error handling connection: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }

            Some(completion) = daemon.completions.recv() => {
                daemon.record_completion(&completion);
            }

            // Wake when the next schedule is due
            _ = tokio::time::sleep(next_fire) => {
                daemon.tick();
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                daemon.shutdown().await?;
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                daemon.shutdown().await?;
                break;
            }
        }

        if daemon.shutdown_requested {
            info!("Shutdown requested via IPC, shutting down...");
            daemon.shutdown().await?;
            break;
        }
    }

    info!("Daemon stopped");
    Ok(())
}

async fn print_status(client: &DaemonClient) -> Result<(), Box<dyn std::error::Error>> {
    if let Response::Status {
        uptime_secs,
        runs_active,
        schedules,
    } = client.send(&Request::Status).await?
    {
        println!("up {uptime_secs}s, {runs_active} runs active, {schedules} schedules");
    }
    if let Response::Schedules { schedules } = client.send(&Request::ListSchedules).await? {
        for s in schedules {
            let next = s
                .next_fire
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<24} {:<28} next {}", s.id, s.trigger, next);
        }
    }
    if let Response::Runs { runs } = client.send(&Request::ListRuns).await? {
        for r in runs {
            println!(
                "  {} {:<24} {:<10} {}",
                r.run_id,
                r.workflow_id,
                r.status,
                r.detail.unwrap_or_default()
            );
        }
    }
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- swd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- swd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.log_path();
    let file_appender = tracing_appender::rolling::never(
        log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
