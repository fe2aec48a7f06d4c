//! Domain types shared across all adbwatch crates

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────
// Device Target
// ─────────────────────────────────────────────────────────

/// Identifier of the monitored device: `host:port` for TCP devices or a
/// bare serial for USB devices.
///
/// Immutable once a monitoring session has started; changing the target
/// requires a session restart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DeviceTarget(String);

impl DeviceTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// TCP targets (`host:port`) need an explicit `adb connect` before use;
    /// USB serials are attached by the adb server itself.
    pub fn is_tcp(&self) -> bool {
        self.0.contains(':')
    }
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceTarget {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─────────────────────────────────────────────────────────
// Pipeline Types
// ─────────────────────────────────────────────────────────

/// A single line of logcat output plus the wall-clock time it was read.
/// Ephemeral, retained only in the raw-line ring buffer.
#[derive(Debug, Clone, Serialize)]
pub struct RawLine {
    pub text: String,
    pub read_at: DateTime<Local>,
}

impl RawLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            read_at: Local::now(),
        }
    }
}

/// A recognized playback-intent event. Produced by the extractor, never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackEvent {
    /// Device-local content path pulled out of the intent line
    pub source_path: String,
    pub observed_at: DateTime<Local>,
}

impl PlaybackEvent {
    pub fn new(source_path: impl Into<String>, observed_at: DateTime<Local>) -> Self {
        Self {
            source_path: source_path.into(),
            observed_at,
        }
    }
}

/// A playback event with its mapped playback path attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedEvent {
    #[serde(flatten)]
    pub event: PlaybackEvent,
    /// Path after prefix-rewrite; equal to `source_path` when no rule matched
    pub mapped_path: String,
}

impl MappedEvent {
    pub fn new(event: PlaybackEvent, mapped_path: impl Into<String>) -> Self {
        Self {
            event,
            mapped_path: mapped_path.into(),
        }
    }

    /// Whether any mapping rule actually rewrote the path
    pub fn is_mapped(&self) -> bool {
        self.event.source_path != self.mapped_path
    }
}

/// Outcome of one delivery attempt for a mapped event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// No endpoint configured; no network call was made
    Disabled,
    /// Endpoint returned 2xx
    Success,
    /// Delivery failed; carries a short machine-readable cause
    /// (`timeout`, `connection_refused`, `http_4xx`, `http_5xx`, ...)
    Failed(String),
    /// Suppressed by the cooldown filter; never dispatched
    Duplicate,
}

impl NotificationOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// One fully-processed event as retained for inspection: the original line,
/// the extracted and mapped paths, and the delivery outcome.
///
/// Immutable once appended to the record ring buffer; only eviction
/// removes it.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub observed_at: DateTime<Local>,
    pub original_line: String,
    pub source_path: String,
    pub mapped_path: String,
    pub outcome: NotificationOutcome,
}

impl LogRecord {
    pub fn new(
        mapped: &MappedEvent,
        original_line: impl Into<String>,
        outcome: NotificationOutcome,
    ) -> Self {
        Self {
            observed_at: mapped.event.observed_at,
            original_line: original_line.into(),
            source_path: mapped.event.source_path.clone(),
            mapped_path: mapped.mapped_path.clone(),
            outcome,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────

/// Authoritative health snapshot of the monitoring session.
///
/// Owned exclusively by the monitor session; everything else reads clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Monitoring was started and has not been stopped
    pub running: bool,
    /// The transport currently reaches the device
    pub device_connected: bool,
    /// Monitoring was attempted (or was live) and the transport failed;
    /// cleared by `stop()` and on successful reconnect
    pub monitoring_failed: bool,
    /// Resolved device identifier, once known
    pub device_id: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Transport Events
// ─────────────────────────────────────────────────────────

/// Events emitted by the logcat transport toward the monitor session.
#[derive(Debug, Clone)]
pub enum AdbEvent {
    /// One decoded line of logcat output
    Line(RawLine),
    /// One line of the child's stderr
    Stderr(String),
    /// The logcat child exited; carries the real exit code when known
    Exited { code: Option<i32> },
}
