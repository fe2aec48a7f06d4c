//! # adbwatch-core - Core Domain Types
//!
//! Foundation crate for adbwatch. Provides domain types, error handling,
//! the ring buffer, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DeviceTarget`] - Monitored device identifier (`host:port` or serial)
//! - [`RawLine`] - One logcat line with its read timestamp
//! - [`PlaybackEvent`] - Recognized playback intent with source path
//! - [`MappedEvent`] - Playback event plus rewritten playback path
//! - [`NotificationOutcome`] - Delivery result (disabled/success/failed/duplicate)
//! - [`LogRecord`] - Fully-processed event retained for inspection
//! - [`SessionState`] - Session health snapshot
//! - [`AdbEvent`] - Transport-to-session event (line/stderr/exit)
//!
//! ### Ring Buffer (`ring`)
//! - [`RingBuffer`] - Fixed-capacity FIFO history with oldest-first eviction
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use adbwatch_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod ring;
pub mod types;

/// Prelude for common imports used throughout all adbwatch crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use ring::RingBuffer;
pub use types::{
    AdbEvent, DeviceTarget, LogRecord, MappedEvent, NotificationOutcome, PlaybackEvent, RawLine,
    SessionState,
};
