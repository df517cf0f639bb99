//! LMS Bridge - Headless bridge for Logitech Media Server players.
//!
//! Discovers the players of an LMS instance, keeps one local device per
//! player in sync with the server, and persists the device cache so
//! identities survive restarts. Designed to run as a background daemon.

mod config;
mod host;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lms_bridge_core::{bootstrap_services, DeviceHost};
use tokio::signal;

use crate::config::ServerConfig;
use crate::host::FileDeviceHost;

/// LMS Bridge - Logitech Media Server players as local devices.
#[derive(Parser, Debug)]
#[command(name = "lms-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "LMS_BRIDGE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// LMS base URL, e.g. http://nas.local:9000 (overrides config file).
    #[arg(short = 's', long, env = "LMS_BRIDGE_SERVER_URL")]
    server_url: Option<String>,

    /// Data directory for the accessory cache.
    #[arg(short = 'd', long, env = "LMS_BRIDGE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration before logging so `debug: true` can raise the level
    let config_result = ServerConfig::load(args.config.as_deref());
    let debug = config_result.as_ref().is_ok_and(|c| c.debug);

    let level = if debug {
        args.log_level.max(log::LevelFilter::Debug)
    } else {
        args.log_level
    };

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .init();

    log::info!("LMS Bridge v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config_result.context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.server_url {
        config.server_url = Some(url);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    let core_config = config.to_core_config();
    log::info!(
        "Configuration: server={}, discovery every {} ms, status every {} ms, page_size={}",
        core_config.server_url,
        core_config.discovery_interval_ms,
        core_config.poll_interval_ms,
        core_config.page_size
    );

    let host = if let Some(ref data_dir) = config.data_dir {
        log::info!("Using data directory: {}", data_dir.display());
        FileDeviceHost::load(data_dir).context("Failed to load accessory cache")?
    } else {
        log::info!("No data directory configured - accessories will not persist");
        FileDeviceHost::in_memory()
    };

    let services = bootstrap_services(&core_config, Arc::new(host) as Arc<dyn DeviceHost>)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    // Restore cached devices BEFORE the first discovery cycle so they are
    // adopted rather than registered again.
    services.restore_cached_devices();
    services.start_background_tasks();

    log::info!("Background tasks started");

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
