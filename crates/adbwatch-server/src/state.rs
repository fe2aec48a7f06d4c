//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use adbwatch_watcher::{AdbMonitorSession, ConfigHandle};

/// Shared application state accessible from all route handlers.
///
/// The API layer is a thin shell: it only reads the session's status board
/// and calls its lifecycle methods. Nothing here holds monitoring state of
/// its own.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// The monitoring session (lifecycle + status board).
    pub session: Arc<AdbMonitorSession>,
    /// Shared live configuration.
    pub config: ConfigHandle,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(session: Arc<AdbMonitorSession>, config: ConfigHandle) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            session,
            config,
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
