//! One-shot device reachability test.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use adbwatch_watcher::ConnectionTestReport;

use crate::state::AppState;

/// POST /api/probe - Try to reach the configured (or discovered) device
/// without touching the monitoring session.
pub async fn probe_device(State(state): State<Arc<AppState>>) -> Json<ConnectionTestReport> {
    Json(state.session.test_connection().await)
}

/// Create the probe routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/probe", post(probe_device))
}
