//! Configuration for adbwatch
//!
//! Supports:
//! - `<config-dir>/adbwatch/config.toml` - Persisted settings (TOML)
//! - Live reload: shared handle swapped by the API and by a file watcher

pub mod settings;
pub mod types;
pub mod watcher;

pub use settings::{default_config_path, load_settings, save_settings, ConfigHandle};
pub use types::{
    DeviceSettings, GeneralSettings, LogcatSettings, MappingRule, NotificationSettings,
    ServerSettings, Settings,
};
pub use watcher::ConfigWatcher;
