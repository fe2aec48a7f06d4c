//! Watcher status endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use adbwatch_watcher::StatusSnapshot;

use crate::state::AppState;

/// Response for the status endpoint: session health plus the relevant
/// configuration the dashboard needs alongside it.
#[derive(Debug, Serialize)]
pub struct WatcherStatus {
    pub running: bool,
    pub device_connected: bool,
    pub monitoring_failed: bool,
    pub device_id: Option<String>,
    pub notification_endpoint: Option<String>,
    pub enable_watcher: bool,
}

/// GET /api/status - Current watcher health.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<WatcherStatus> {
    let session_state = state.session.status_board().state();
    let settings = state.config.current();

    Json(WatcherStatus {
        running: session_state.running,
        device_connected: session_state.device_connected,
        monitoring_failed: session_state.monitoring_failed,
        device_id: session_state
            .device_id
            .or_else(|| settings.device_target().map(str::to_string)),
        notification_endpoint: settings.notification_endpoint().map(str::to_string),
        enable_watcher: settings.general.enable_watcher,
    })
}

/// GET /api/status/snapshot - Health flags plus recent event records.
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.session.status_board().snapshot())
}

/// Create the status routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/status/snapshot", get(get_snapshot))
}
