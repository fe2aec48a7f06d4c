//! Settings loading, saving, and the shared live handle

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use adbwatch_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = "adbwatch";

/// Default config file location: `<config-dir>/adbwatch/config.toml`
pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(CONFIG_DIR).join(CONFIG_FILENAME)
}

/// Load settings from a TOML file.
///
/// A missing file yields the defaults (first run); invalid TOML is an error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        Error::config_invalid(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Save settings to a TOML file.
///
/// Writes to a temp file in the same directory and renames over the target
/// so readers never observe a half-written document.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content).context("Failed to write temp config")?;
    std::fs::rename(&tmp_path, path).context("Failed to replace config file")?;

    debug!("Saved configuration to {}", path.display());
    Ok(())
}

/// Shared live settings handle.
///
/// The running session reads the current settings per event; the API's
/// config route and the file watcher swap them in place, so changes are
/// observed without restarting the session.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Settings>>,
    /// Backing file; `None` for in-memory handles used in tests
    path: Option<PathBuf>,
}

impl ConfigHandle {
    /// Load from the given file (missing file = defaults) and keep the
    /// path for later saves and reloads.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = load_settings(&path)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
            path: Some(path),
        })
    }

    /// An in-memory handle with no backing file
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            path: None,
        }
    }

    /// Snapshot of the current settings
    pub fn current(&self) -> Settings {
        self.inner.read().expect("config lock poisoned").clone()
    }

    /// Persist new settings and swap them live
    pub fn update(&self, settings: Settings) -> Result<()> {
        if let Some(path) = &self.path {
            save_settings(path, &settings)?;
        }
        *self.inner.write().expect("config lock poisoned") = settings;
        Ok(())
    }

    /// Re-read the backing file (e.g. after an external edit)
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let settings = load_settings(path)?;
        *self.inner.write().expect("config lock poisoned") = settings;
        info!("Configuration reloaded from {}", path.display());
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("path", &self.path)
            .finish()
    }
}
