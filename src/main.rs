//! header-forge daemon.
//!
//! Loads persisted profiles, re-arms the auto-disable timer, runs the
//! startup compile-and-apply pass, and serves the control API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use header_forge::config::{load_config, ForgeConfig};
use header_forge::control::{setup_control_router, ControlState};
use header_forge::engine::HeaderEngine;
use header_forge::intercept::memory::MemoryLayer;
use header_forge::observability::logging::init_logging;
use header_forge::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "header-forge")]
#[command(about = "Header override rule engine and control API", long_about = None)]
struct Cli {
    /// Path to the TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ForgeConfig::default(),
    };

    init_logging(&config.observability.log_level);
    tracing::info!("header-forge v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.control.bind_address,
        state_path = %config.storage.state_path,
        max_rules = config.intercept.max_rules,
        "Configuration loaded"
    );

    let storage = Arc::new(JsonFileStore::new(&config.storage.state_path));
    let (layer, match_rx) = MemoryLayer::new(config.intercept.max_rules);
    let layer = Arc::new(layer);

    let engine = HeaderEngine::start(storage, layer, match_rx).await?;

    let state = ControlState {
        engine,
        api_key: config.control.api_key.clone(),
    };
    let app = setup_control_router(state);

    let listener = TcpListener::bind(&config.control.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Control API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
