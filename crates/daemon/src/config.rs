// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Loaded once at startup from a TOML file. Secrets named by `token_env` are
//! read from the environment here and nowhere else.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sw_adapters::{GatewayConfig, UptimeConfig};
use sw_core::DEFAULT_EXECUTION_TIMEOUT;
use sw_engine::{ActivitySettings, SpawnConfig, DEFAULT_COMPACT_AFTER};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("gateway token variable {0} is not set")]
    MissingToken(String),

    #[error("unknown timezone: {0}")]
    Timezone(String),
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub daemon: DaemonSection,
    pub gateway: GatewaySection,
    #[serde(default)]
    pub notify: Option<NotifySection>,
    #[serde(default)]
    pub uptime: Option<UptimeConfig>,
    #[serde(default)]
    pub clock: ClockSection,
    #[serde(default)]
    pub spawn: SpawnSection,
    #[serde(skip)]
    timezone: Option<Tz>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonSection {
    /// WAL, lock, log and socket live here
    pub state_dir: PathBuf,
    /// Runbook path, relative to the config file
    pub runbook: PathBuf,
    /// Ceiling for manually triggered runs
    #[serde(with = "humantime_serde", default = "default_execution_timeout")]
    pub execution_timeout: Duration,
    /// WAL entries written before they are folded into a snapshot
    #[serde(default = "default_compact_after")]
    pub compact_after: u64,
}

fn default_execution_timeout() -> Duration {
    DEFAULT_EXECUTION_TIMEOUT
}

fn default_compact_after() -> u64 {
    DEFAULT_COMPACT_AFTER
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable holding the token
    #[serde(default)]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    /// Default chat target for workflow notifications
    pub channel: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockSection {
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    "Europe/Budapest".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnSection {
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for SpawnSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_poll_interval() -> Duration {
    SpawnConfig::default().poll_interval
}

fn default_history_limit() -> u32 {
    SpawnConfig::default().history_limit
}

impl Config {
    /// Load from `path`, resolving relative paths and the gateway token
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse config text; relative paths are taken from `base`
    pub fn parse(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;

        config.daemon.runbook = base.join(&config.daemon.runbook);
        config.daemon.state_dir = base.join(&config.daemon.state_dir);

        if config.gateway.token.is_none() {
            if let Some(var) = &config.gateway.token_env {
                let token =
                    std::env::var(var).map_err(|_| ConfigError::MissingToken(var.clone()))?;
                config.gateway.token = Some(token);
            }
        }

        let tz: Tz = config
            .clock
            .timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(config.clock.timezone.clone()))?;
        config.timezone = Some(tz);

        Ok(config)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.daemon.state_dir.join("swd.sock")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.daemon.state_dir.join("swd.pid")
    }

    pub fn version_path(&self) -> PathBuf {
        self.daemon.state_dir.join("swd.version")
    }

    pub fn log_path(&self) -> PathBuf {
        self.daemon.state_dir.join("swd.log")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.daemon.state_dir.join("wal").join("events.wal")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.daemon.state_dir.join("wal").join("snapshot.json")
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(
            &self.gateway.url,
            self.gateway.token.clone().unwrap_or_default(),
        )
    }

    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            poll_interval: self.spawn.poll_interval,
            history_limit: self.spawn.history_limit,
            ..SpawnConfig::default()
        }
    }

    pub fn activity_settings(&self) -> ActivitySettings {
        ActivitySettings {
            timezone: self.timezone.unwrap_or(chrono_tz::Europe::Budapest),
            notify_target: self
                .notify
                .as_ref()
                .map(|n| n.channel.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
