//! # adbwatch-adb - adb Transport Layer
//!
//! Manages the debug-bridge side of adbwatch: locating the adb binary,
//! discovering devices, establishing and probing connections, and
//! streaming filtered logcat output as a restartable event sequence.
//!
//! Depends on [`adbwatch_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Availability
//! - [`AdbAvailability`] - Locate a working adb binary at startup
//!
//! ### Device Discovery
//! - [`AdbDevice`], [`DeviceState`] - Parsed `adb devices -l` entries
//! - [`discover_devices()`] - List attached devices
//! - [`discover_sole_device()`] - Pick the only ready device, or error
//!
//! ### Connection
//! - [`connect()`] - `adb connect` (TCP targets) plus shell probe
//! - [`probe()`] - Cheap liveness check
//!
//! ### Logcat Streaming
//! - [`LogcatFilter`] - Source-side buffer/tag/pattern filter
//! - [`LogcatProcess`] - Spawn and manage the `adb logcat` child
//! - [`clear_buffer()`] - Drop device-side history before streaming
//!
//! ### Transport Seam
//! - [`LogSource`] - Capability trait the monitor session runs against
//! - [`AdbSource`] - Production implementation over the adb CLI
//! - [`LogcatStream`] - One live stream plus its stop handle

pub mod availability;
pub mod connection;
pub mod devices;
pub mod logcat;
pub mod source;

// Public API re-exports
pub use availability::AdbAvailability;
pub use connection::{connect, probe};
pub use devices::{discover_devices, discover_sole_device, AdbDevice, DeviceState};
pub use logcat::{clear_buffer, LogcatFilter, LogcatProcess};
pub use source::{AdbSource, LogSource, LogcatStream};
