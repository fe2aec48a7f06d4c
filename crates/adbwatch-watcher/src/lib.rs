//! # adbwatch-watcher - Monitoring Core
//!
//! The heart of adbwatch: recognizes playback-intent events inside the
//! logcat stream, suppresses duplicates, rewrites device paths into
//! playback paths, delivers notifications, and keeps the whole watch alive
//! across transport drops.
//!
//! Depends on [`adbwatch_core`] for domain types and [`adbwatch_adb`] for
//! the transport seam.
//!
//! ## Public API
//!
//! ### Configuration (`config`)
//! - [`Settings`] - The full TOML configuration document
//! - [`ConfigHandle`] - Shared live handle; swap settings without restart
//! - [`ConfigWatcher`] - Reload on external file edits
//!
//! ### Pipeline Stages
//! - [`EventExtractor`] - Pattern match + `dat=` path extraction
//! - [`CooldownFilter`] - Per-path duplicate suppression
//! - [`map_path()`] - Ordered first-match prefix rewrite
//! - [`Notifier`] - One-shot HTTP delivery with bounded timeout
//! - [`EventPipeline`] - Glue running one line through all stages
//!
//! ### Observable State (`status`)
//! - [`StatusBoard`] - Health flags plus raw-line and record history
//! - [`StatusSnapshot`] - Read-only view for external consumers
//!
//! ### Lifecycle (`session`)
//! - [`MonitorSession`] - start/stop/restart plus the reconnect loop
//! - [`AdbMonitorSession`] - The production session over the adb CLI

pub mod config;
pub mod cooldown;
pub mod dispatch;
pub mod extract;
pub mod mapping;
pub mod pipeline;
pub mod session;
pub mod status;

// Public API re-exports
pub use config::{
    default_config_path, ConfigHandle, ConfigWatcher, MappingRule, Settings,
};
pub use cooldown::CooldownFilter;
pub use dispatch::Notifier;
pub use extract::EventExtractor;
pub use mapping::map_path;
pub use pipeline::EventPipeline;
pub use session::{AdbMonitorSession, ConnectionTestReport, MonitorSession};
pub use status::{StatusBoard, StatusSnapshot, RAW_LINE_CAPACITY, RECORD_CAPACITY};
