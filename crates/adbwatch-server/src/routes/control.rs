//! Start/stop/restart control endpoints.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Generic response for control commands.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Persist the enable flag so the choice survives a process restart.
fn set_enable_watcher(state: &AppState, enabled: bool) {
    let mut settings = state.config.current();
    if settings.general.enable_watcher == enabled {
        return;
    }
    info!(
        "{} monitoring in configuration",
        if enabled { "Enabling" } else { "Disabling" }
    );
    settings.general.enable_watcher = enabled;
    if let Err(e) = state.config.update(settings) {
        warn!("Failed to persist enable_watcher={}: {}", enabled, e);
    }
}

/// POST /api/start - Start monitoring.
///
/// Establishing the transport can take seconds, so the work runs in the
/// background and the response returns immediately; progress is visible
/// via /api/status.
pub async fn start_monitoring(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    set_enable_watcher(&state, true);

    let session = Arc::clone(&state.session);
    tokio::spawn(async move {
        if let Err(e) = session.start().await {
            error!("Failed to start monitoring: {}", e);
        }
    });

    Json(CommandResponse::ok("Starting monitoring..."))
}

/// POST /api/stop - Stop monitoring.
pub async fn stop_monitoring(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    set_enable_watcher(&state, false);
    state.session.stop().await;
    Json(CommandResponse::ok("Monitoring stopped"))
}

/// POST /api/restart - Restart monitoring against the last-used target.
pub async fn restart_monitoring(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    let session = Arc::clone(&state.session);
    tokio::spawn(async move {
        if let Err(e) = session.restart().await {
            error!("Failed to restart monitoring: {}", e);
        }
    });

    Json(CommandResponse::ok("Restarting monitoring..."))
}

/// Create the control routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start", post(start_monitoring))
        .route("/stop", post(stop_monitoring))
        .route("/restart", post(restart_monitoring))
}
