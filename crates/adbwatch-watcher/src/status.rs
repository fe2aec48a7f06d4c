//! Process-wide observable monitoring state
//!
//! The status board is the single place the monitoring tasks write their
//! health transitions and processed events, and the only thing external
//! readers (the HTTP API) ever see. Readers get snapshot clones; no caller
//! outside this crate can mutate session state directly.

use std::sync::{Mutex, RwLock};

use serde::Serialize;

use adbwatch_core::{LogRecord, RawLine, RingBuffer, SessionState};

/// Capacity of the raw-line history
pub const RAW_LINE_CAPACITY: usize = 1000;

/// Capacity of the recognized-event history
pub const RECORD_CAPACITY: usize = 100;

/// Default number of records included in a status snapshot
const SNAPSHOT_RECORDS: usize = 50;

/// Read-only view of the aggregator for external consumers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub recent_records: Vec<LogRecord>,
}

/// Shared mutable state between the monitoring tasks and status readers.
///
/// Locks are never held across `.await`: every method takes the lock,
/// copies or mutates, and returns.
#[derive(Debug)]
pub struct StatusBoard {
    state: RwLock<SessionState>,
    raw_lines: Mutex<RingBuffer<RawLine>>,
    records: Mutex<RingBuffer<LogRecord>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::with_capacities(RAW_LINE_CAPACITY, RECORD_CAPACITY)
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacities(raw_capacity: usize, record_capacity: usize) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            raw_lines: Mutex::new(RingBuffer::new(raw_capacity)),
            records: Mutex::new(RingBuffer::new(record_capacity)),
        }
    }

    // ── Transitions (write access restricted to the monitoring core) ────

    /// Monitoring started and the device answered
    pub fn session_started(&self, device_id: &str) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.running = true;
        state.device_connected = true;
        state.monitoring_failed = false;
        state.device_id = Some(device_id.to_string());
    }

    /// `start()` was attempted but the transport could not be established
    pub fn start_failed(&self, device_id: Option<&str>) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.running = false;
        state.device_connected = false;
        state.monitoring_failed = true;
        if let Some(id) = device_id {
            state.device_id = Some(id.to_string());
        }
    }

    /// The transport dropped while monitoring; the session keeps running
    /// and retries in the background
    pub fn connection_lost(&self) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.device_connected = false;
        state.monitoring_failed = true;
    }

    /// A reconnect attempt succeeded
    pub fn reconnected(&self) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.device_connected = true;
        state.monitoring_failed = false;
    }

    /// Explicit `stop()`: all health flags cleared
    pub fn stopped(&self) {
        let mut state = self.state.write().expect("state lock poisoned");
        state.running = false;
        state.device_connected = false;
        state.monitoring_failed = false;
    }

    pub fn push_line(&self, line: RawLine) {
        self.raw_lines.lock().expect("line lock poisoned").push(line);
    }

    pub fn push_record(&self, record: LogRecord) {
        self.records
            .lock()
            .expect("record lock poisoned")
            .push(record);
    }

    // ── Read side ────────────────────────────────────────────────────────

    /// Current health flags
    pub fn state(&self) -> SessionState {
        self.state.read().expect("state lock poisoned").clone()
    }

    /// Health flags plus the most recent event records
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state(),
            recent_records: self.recent_records(SNAPSHOT_RECORDS),
        }
    }

    /// The most recent `count` raw lines, oldest first
    pub fn recent_lines(&self, count: usize) -> Vec<RawLine> {
        self.raw_lines
            .lock()
            .expect("line lock poisoned")
            .tail(count)
            .cloned()
            .collect()
    }

    /// The most recent `count` event records, oldest first
    pub fn recent_records(&self, count: usize) -> Vec<LogRecord> {
        self.records
            .lock()
            .expect("record lock poisoned")
            .tail(count)
            .cloned()
            .collect()
    }
}
