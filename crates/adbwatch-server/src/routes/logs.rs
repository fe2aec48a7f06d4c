//! Recent-history endpoints: raw lines and recognized event records.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use adbwatch_core::LogRecord;

use crate::state::AppState;

const DEFAULT_LOG_COUNT: usize = 100;
const DEFAULT_EVENT_COUNT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub count: Option<usize>,
}

/// GET /api/logs?count=N - Most recent raw logcat lines, oldest first.
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CountQuery>,
) -> Json<Vec<String>> {
    let count = query.count.unwrap_or(DEFAULT_LOG_COUNT);
    let lines = state
        .session
        .status_board()
        .recent_lines(count)
        .into_iter()
        .map(|line| line.text)
        .collect();
    Json(lines)
}

/// GET /api/events?count=N - Most recent recognized events with their
/// mapped paths and notification outcomes, oldest first.
pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CountQuery>,
) -> Json<Vec<LogRecord>> {
    let count = query.count.unwrap_or(DEFAULT_EVENT_COUNT);
    Json(state.session.status_board().recent_records(count))
}

/// Create the log routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logs", get(get_logs))
        .route("/events", get(get_events))
}
