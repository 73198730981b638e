//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that orchestrates
//! configuration loading, relay startup, stats persistence, the operator
//! console, and graceful shutdown.

use crate::{cli::CliArgs, config::AppConfig, console, logging::display_banner, stats::FileStats};
use relay_server::RelayServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Main application struct.
///
/// Manages the complete lifecycle of the relay: configuration merging,
/// server initialization, background tasks, and shutdown handling.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Relay server instance
    server: RelayServer,
    /// File-backed statistics sink
    stats: Arc<FileStats>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates settings, and
    /// initializes the relay server.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli_overrides(&args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let stats = Arc::new(FileStats::load(&config.stats.file_path));
        let server = RelayServer::new(config.to_relay_config()?, stats.clone());

        info!(
            "📂 Config: {} | Stats: {} | Bind: {}",
            args.config_path.display(),
            config.stats.file_path,
            config.server.bind_address
        );

        Ok(Self { config, server, stats })
    }

    /// Runs the application until a shutdown signal arrives.
    ///
    /// Spawns the stats persistence heartbeat and the operator console,
    /// then serves connections. On Ctrl+C every connected client is
    /// notified before the process exits.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let relay = self.server.relay().clone();

        self.stats
            .spawn_heartbeat(Duration::from_secs(self.config.stats.persist_interval_secs));
        console::spawn_console(relay.clone(), self.stats.clone());

        let server_handle = {
            let server = self.server;
            tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    error!("❌ Server error: {e}");
                    std::process::exit(1);
                }
            })
        };

        tokio::signal::ctrl_c().await?;
        info!("🛑 Shutdown signal received");

        relay.message_all("").await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        server_handle.abort();

        self.stats.reset_online();
        if let Err(e) = self.stats.persist().await {
            warn!("error writing final stats: {e}");
        }
        info!("👋 Shutdown complete");
        Ok(())
    }
}
