//! # adbwatch-server - HTTP Status/Control API
//!
//! Thin Axum shell over the monitoring core: reads the session's status
//! board and calls its lifecycle methods, nothing more. JSON only, no
//! authentication (single local operator by design).
//!
//! ## Routes
//!
//! | Method | Path                   | Purpose                           |
//! |--------|------------------------|-----------------------------------|
//! | GET    | `/api/health`          | Liveness, version, uptime         |
//! | GET    | `/api/status`          | Session health flags              |
//! | GET    | `/api/status/snapshot` | Health plus recent event records  |
//! | POST   | `/api/start`           | Start monitoring (background)     |
//! | POST   | `/api/stop`            | Stop monitoring                   |
//! | POST   | `/api/restart`         | Restart monitoring (background)   |
//! | GET    | `/api/logs`            | Recent raw logcat lines           |
//! | GET    | `/api/events`          | Recent recognized events          |
//! | GET    | `/api/config`          | Current settings document         |
//! | PUT    | `/api/config`          | Validate, persist, apply settings |
//! | POST   | `/api/probe`           | One-shot device reachability test |

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod routes;
pub mod state;

pub use routes::control::CommandResponse;
pub use routes::status::WatcherStatus;
pub use state::AppState;

/// Build the application router with tracing and permissive CORS (the
/// dashboard may be served from another origin during development).
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
