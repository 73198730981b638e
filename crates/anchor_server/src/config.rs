//! Configuration management for the Anchor relay server.
//!
//! This module handles loading, validation, and conversion of server
//! configuration from TOML files and command-line arguments.

use crate::cli::CliArgs;
use relay_server::RelayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

fn default_bind_address() -> String {
    "127.0.0.1:43385".to_string()
}

fn default_quiet_mode() -> bool {
    true
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_read_poll_interval() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stats_file() -> String {
    "stats.json".to_string()
}

fn default_persist_interval() -> u64 {
    30
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Statistics persistence settings
    #[serde(default)]
    pub stats: StatsSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the relay to (e.g., "127.0.0.1:43385")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Whether per-packet log lines are suppressed at startup
    #[serde(default = "default_quiet_mode")]
    pub quiet_mode: bool,
    /// Seconds between server-originated heartbeat packets
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    /// Seconds a single socket read may block before re-checking shutdown
    #[serde(default = "default_read_poll_interval")]
    pub read_poll_interval_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            quiet_mode: default_quiet_mode(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            read_poll_interval_secs: default_read_poll_interval(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Statistics persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSettings {
    /// Path of the JSON statistics file
    #[serde(default = "default_stats_file")]
    pub file_path: String,
    /// Seconds between statistics writes
    #[serde(default = "default_persist_interval")]
    pub persist_interval_secs: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            file_path: default_stats_file(),
            persist_interval_secs: default_persist_interval(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating the file with default
    /// contents when it does not exist yet.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            let config = Self::default();
            let toml_content = toml::to_string_pretty(&config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("📝 Created default configuration at {}", path.display());
            return Ok(config);
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(quiet) = args.quiet {
            self.server.quiet_mode = quiet;
        }
        if let Some(stats_file) = &args.stats_file {
            self.stats.file_path = stats_file.to_string_lossy().to_string();
        }
    }

    /// Validates the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .map_err(|e| format!("invalid bind address '{}': {e}", self.server.bind_address))?;

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!("invalid log level '{}'", self.logging.level));
        }

        if self.server.heartbeat_interval_secs == 0 {
            return Err("heartbeat interval must be at least one second".to_string());
        }
        if self.server.read_poll_interval_secs == 0 {
            return Err("read poll interval must be at least one second".to_string());
        }
        if self.stats.persist_interval_secs == 0 {
            return Err("stats persistence interval must be at least one second".to_string());
        }
        Ok(())
    }

    /// Converts the application configuration into the relay core's config.
    pub fn to_relay_config(&self) -> Result<RelayConfig, String> {
        Ok(RelayConfig {
            bind_address: self
                .server
                .bind_address
                .parse()
                .map_err(|e| format!("invalid bind address: {e}"))?,
            heartbeat_interval: Duration::from_secs(self.server.heartbeat_interval_secs),
            read_poll_interval: Duration::from_secs(self.server.read_poll_interval_secs),
            quiet_mode: self.server.quiet_mode,
        })
    }
}
