//! # Anchor Server - Main Entry Point
//!
//! Relay server frontend handling CLI parsing, configuration loading,
//! logging setup, stats persistence, and the operator console. The relay
//! core itself lives in the `relay_server` crate.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! anchor_server
//!
//! # Specify custom configuration
//! anchor_server --config production.toml
//!
//! # Override specific settings
//! anchor_server --bind 0.0.0.0:43385 --log-level debug --quiet false
//!
//! # JSON logging for production
//! anchor_server --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Operator Console
//!
//! While running, the server reads commands from stdin: `stats`, `quiet`,
//! `roomCount`, `clientCount`, `list`, `message`, `messageAll`, `disable`,
//! `disableAll`, `stop`. Type `help` for the full syntax.

use tracing::error;

mod app;
mod cli;
mod config;
mod console;
mod logging;
mod stats;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the Anchor relay server.
///
/// Handles the complete application lifecycle including:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
/// 5. Error handling and cleanup
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {e:?}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{LoggingSettings, ServerSettings, StatsSettings};
pub use stats::FileStats;
