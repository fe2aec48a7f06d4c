//! API route modules, one per concern, merged under `/api`.

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod config;
pub mod control;
pub mod health;
pub mod logs;
pub mod probe;
pub mod status;

/// All API routes merged into one router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(control::router())
        .merge(logs::router())
        .merge(config::router())
        .merge(probe::router())
}
