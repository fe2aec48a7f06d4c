//! Configuration types for adbwatch
//!
//! Defines:
//! - `Settings` - The full configuration document
//! - Section sub-types and their defaults

use std::time::Duration;

use serde::{Deserialize, Serialize};

use adbwatch_adb::LogcatFilter;

/// The full configuration document (config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub logcat: LogcatSettings,

    /// Ordered prefix-rewrite rules; first match wins
    #[serde(default, rename = "mapping")]
    pub mappings: Vec<MappingRule>,

    #[serde(default)]
    pub notification: NotificationSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

impl Settings {
    /// Cooldown window as a std Duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.general.cooldown_seconds)
    }

    /// Notification endpoint, with empty treated as disabled
    pub fn notification_endpoint(&self) -> Option<&str> {
        let endpoint = self.notification.endpoint.trim();
        (!endpoint.is_empty()).then_some(endpoint)
    }

    /// Notification timeout as a std Duration
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification.timeout_seconds)
    }

    /// Configured device target, with empty meaning "discover"
    pub fn device_target(&self) -> Option<&str> {
        let target = self.device.target.trim();
        (!target.is_empty()).then_some(target)
    }

    /// Source-side logcat filter for the transport
    pub fn logcat_filter(&self) -> LogcatFilter {
        LogcatFilter {
            buffer: self.logcat.buffer.clone(),
            tags: self.logcat.tags.clone(),
            pattern: self.logcat.pattern.clone(),
        }
    }
}

/// General settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneralSettings {
    /// Default tracing level when ADBWATCH_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Minimum seconds between two acceptances of the same source path
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Start monitoring automatically on boot
    #[serde(default = "default_true")]
    pub enable_watcher: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            cooldown_seconds: default_cooldown_seconds(),
            enable_watcher: true,
        }
    }
}

/// Device settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// `host:port` or bare serial; empty = discover the sole attached device
    #[serde(default)]
    pub target: String,
}

/// Logcat source filter settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogcatSettings {
    /// Log buffer to read
    #[serde(default = "default_logcat_buffer")]
    pub buffer: String,

    /// Tag filter spec
    #[serde(default = "default_logcat_tags")]
    pub tags: String,

    /// Pattern recognizing playback-intent lines (regex)
    #[serde(default = "default_logcat_pattern")]
    pub pattern: String,
}

impl Default for LogcatSettings {
    fn default() -> Self {
        Self {
            buffer: default_logcat_buffer(),
            tags: default_logcat_tags(),
            pattern: default_logcat_pattern(),
        }
    }
}

/// One prefix-rewrite rule translating a device-local path into a playback path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MappingRule {
    /// Prefix matched against the extracted source path
    pub source: String,
    /// Replacement prefix; the remaining suffix is preserved verbatim
    pub target: String,
}

/// Notification settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationSettings {
    /// HTTP endpoint receiving the mapped path; empty = disabled
    #[serde(default)]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_notification_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_seconds: default_notification_timeout(),
        }
    }
}

/// HTTP API server settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cooldown_seconds() -> u64 {
    3
}

fn default_logcat_buffer() -> String {
    "system".to_string()
}

fn default_logcat_tags() -> String {
    "ActivityTaskManager:I".to_string()
}

fn default_logcat_pattern() -> String {
    "START .*cmp=".to_string()
}

fn default_notification_timeout() -> u64 {
    10
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8787
}

fn default_true() -> bool {
    true
}
