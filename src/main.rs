//! adbwatch - watch a device's logcat for playback intents
//!
//! This is the binary entry point. It wires configuration, logging, the
//! monitoring session, and the HTTP API together; all logic lives in the
//! workspace crates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};

use adbwatch_adb::AdbSource;
use adbwatch_server::{create_app, AppState};
use adbwatch_watcher::{default_config_path, AdbMonitorSession, ConfigHandle, ConfigWatcher};

/// adbwatch - watch a device's logcat for playback intents and hand them
/// to a downstream player over HTTP
#[derive(Parser, Debug)]
#[command(name = "adbwatch")]
#[command(about = "Watch a device's logcat for playback intents", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the API server port from the configuration
    #[arg(long)]
    port: Option<u16>,

    /// Run the monitor without the HTTP API
    #[arg(long)]
    no_server: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = ConfigHandle::load(&config_path)?;

    adbwatch_core::logging::init(&config.current().general.log_level)?;
    info!("Configuration: {}", config_path.display());

    let source = AdbSource::locate().await?;
    info!("Using adb: {}", source.adb_path());

    let session = Arc::new(AdbMonitorSession::new(source, config.clone()));

    // Pick up hand edits of the config file while running
    let mut config_watcher = ConfigWatcher::new(config.clone());
    config_watcher.start();

    if config.current().general.enable_watcher {
        // The device may simply be off right now; stay up and let the
        // operator start monitoring later via the API.
        if let Err(e) = session.start().await {
            warn!("Monitoring not started: {}", e);
        }
    } else {
        info!("Monitoring disabled in configuration");
    }

    if args.no_server {
        info!("Running headless, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
    } else {
        let settings = config.current();
        let port = args.port.unwrap_or(settings.server.port);
        let addr = format!("{}:{}", settings.server.host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API listening on http://{}", addr);

        let state = AppState::new(Arc::clone(&session), config.clone());
        axum::serve(listener, create_app(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
    }

    info!("Shutting down");
    session.stop().await;
    config_watcher.stop();
    Ok(())
}
