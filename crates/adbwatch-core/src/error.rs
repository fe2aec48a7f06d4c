//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb not found. Ensure 'adb' is in your PATH or set ANDROID_HOME.")]
    AdbNotFound,

    #[error("No device reachable{}", .target.as_deref().map(|t| format!(": {}", t)).unwrap_or_default())]
    NoDevice { target: Option<String> },

    #[error("{count} devices attached but no target configured; set device.target")]
    AmbiguousDevice { count: usize },

    #[error("Invalid device target: {target}")]
    InvalidTarget { target: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Failed to spawn logcat process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Logcat process exited unexpectedly with code: {code:?}")]
    ProcessExit { code: Option<i32> },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn no_device(target: Option<&str>) -> Self {
        Self::NoDevice {
            target: target.map(str::to_string),
        }
    }

    pub fn invalid_target(target: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors keep the monitoring session alive: the reconnect
    /// loop absorbs them and retries with backoff.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::NoDevice { .. } | Error::ProcessExit { .. }
        )
    }

    /// Check if this error should terminate the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AdbNotFound | Error::ConfigInvalid { .. } | Error::InvalidTarget { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
