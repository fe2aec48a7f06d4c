//! The transport seam between adb and the monitor session
//!
//! [`LogSource`] is the capability interface the monitor session runs
//! against: resolve a target, connect, probe, stream. The production
//! implementation shells out to adb; tests drive the session with fakes
//! that feed scripted events.

use tokio::sync::mpsc;

use adbwatch_core::prelude::*;
use adbwatch_core::{AdbEvent, DeviceTarget};

use crate::availability::AdbAvailability;
use crate::connection;
use crate::devices;
use crate::logcat::{self, LogcatFilter, LogcatProcess};

/// Capacity of the transport-to-session event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A live, filtered logcat line stream plus the handle needed to stop it.
///
/// Finite: the receiver yields `None` (or `AdbEvent::Exited`) when the
/// underlying process dies. The session's reconnect loop restarts it.
pub struct LogcatStream {
    events: mpsc::Receiver<AdbEvent>,
    process: Option<LogcatProcess>,
}

impl LogcatStream {
    /// Assemble a stream from raw parts. `process` is `None` for fake
    /// streams that have no child to kill.
    pub fn from_parts(events: mpsc::Receiver<AdbEvent>, process: Option<LogcatProcess>) -> Self {
        Self { events, process }
    }

    /// Next transport event; `None` once the channel has drained after exit.
    pub async fn next_event(&mut self) -> Option<AdbEvent> {
        self.events.recv().await
    }

    /// Terminate the underlying process, if any, and wait briefly for it.
    pub async fn shutdown(&mut self) {
        if let Some(process) = self.process.as_mut() {
            process.shutdown().await;
        }
    }
}

impl std::fmt::Debug for LogcatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogcatStream")
            .field("has_process", &self.process.is_some())
            .finish()
    }
}

/// Capability interface over the device log transport.
///
/// Everything the monitor session needs from adb, and nothing else, so the
/// session loop is testable against a fake stream without a real device.
#[trait_variant::make(Send)]
pub trait LogSource: Sync + 'static {
    /// Resolve the monitored target: the configured identifier when set,
    /// otherwise the sole ready attached device.
    async fn resolve(&self, configured: Option<&str>) -> Result<DeviceTarget>;

    /// Establish (or re-establish) the transport to `target`.
    async fn connect(&self, target: &DeviceTarget) -> Result<()>;

    /// Cheap liveness probe; `false` means the device stopped answering.
    async fn is_alive(&self, target: &DeviceTarget) -> bool;

    /// Start streaming filtered log lines from `target`.
    async fn stream(&self, target: &DeviceTarget, filter: &LogcatFilter) -> Result<LogcatStream>;
}

/// Production [`LogSource`] backed by the adb CLI.
#[derive(Debug, Clone)]
pub struct AdbSource {
    adb_path: String,
}

impl AdbSource {
    /// Locate the adb binary and build a source, failing fast when the
    /// binary is missing.
    pub async fn locate() -> Result<Self> {
        let availability = AdbAvailability::check().await;
        match availability.adb_path {
            Some(path) => Ok(Self { adb_path: path }),
            None => Err(Error::AdbNotFound),
        }
    }

    /// Build a source around a known adb path (used by tests and by
    /// callers that already ran the availability check).
    pub fn with_path(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }
}

/// Reject obviously malformed `host:port` targets before they reach adb,
/// which would otherwise retry them forever.
fn validate_target(id: &str) -> Result<DeviceTarget> {
    if let Some((host, port)) = id.rsplit_once(':') {
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(Error::invalid_target(id));
        }
    }
    Ok(DeviceTarget::new(id))
}

impl LogSource for AdbSource {
    async fn resolve(&self, configured: Option<&str>) -> Result<DeviceTarget> {
        match configured {
            Some(id) if !id.trim().is_empty() => validate_target(id.trim()),
            _ => devices::discover_sole_device(&self.adb_path).await,
        }
    }

    async fn connect(&self, target: &DeviceTarget) -> Result<()> {
        connection::connect(&self.adb_path, target).await
    }

    async fn is_alive(&self, target: &DeviceTarget) -> bool {
        connection::probe(&self.adb_path, target).await
    }

    async fn stream(&self, target: &DeviceTarget, filter: &LogcatFilter) -> Result<LogcatStream> {
        logcat::clear_buffer(&self.adb_path, target, &filter.buffer).await;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let process = LogcatProcess::spawn(&self.adb_path, target, filter, event_tx)?;

        Ok(LogcatStream::from_parts(event_rx, Some(process)))
    }
}
