//! Configuration read/update endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info};
use url::Url;

use adbwatch_watcher::{EventExtractor, Settings};

use crate::routes::control::CommandResponse;
use crate::state::AppState;

/// GET /api/config - The full settings document.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.config.current())
}

/// Reject documents that would break the running session.
fn validate(settings: &Settings) -> Result<(), String> {
    EventExtractor::new(&settings.logcat.pattern).map_err(|e| e.to_string())?;

    if let Some(endpoint) = settings.notification_endpoint() {
        Url::parse(endpoint).map_err(|e| format!("Invalid notification endpoint: {}", e))?;
    }

    Ok(())
}

/// PUT /api/config - Validate, persist, and apply new settings.
///
/// Everything except the device target takes effect on the next event; a
/// target change restarts the session in the background when it is running.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Settings>,
) -> (StatusCode, Json<CommandResponse>) {
    if let Err(message) = validate(&settings) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(CommandResponse::fail(message)),
        );
    }

    let target_changed = state.config.current().device.target != settings.device.target;

    if let Err(e) = state.config.update(settings) {
        error!("Failed to save configuration: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CommandResponse::fail(format!(
                "Failed to save configuration: {}",
                e
            ))),
        );
    }

    if target_changed && state.session.status_board().state().running {
        info!("Device target changed, restarting monitoring");
        let session = Arc::clone(&state.session);
        tokio::spawn(async move {
            if let Err(e) = session.restart().await {
                error!("Failed to restart after target change: {}", e);
            }
        });
        return (
            StatusCode::OK,
            Json(CommandResponse::ok(
                "Configuration updated; restarting monitoring for new device target",
            )),
        );
    }

    (
        StatusCode::OK,
        Json(CommandResponse::ok("Configuration updated")),
    )
}

/// Create the config routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/config", get(get_config).put(update_config))
}
