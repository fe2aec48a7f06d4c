//! adb binary availability checking
//!
//! Locates a usable `adb` binary once at startup, trying PATH first and
//! then the standard SDK locations.

use std::process::Stdio;
use tokio::process::Command;

/// Cached location of the adb binary
#[derive(Debug, Clone, Default)]
pub struct AdbAvailability {
    /// Whether a working adb binary was found
    pub available: bool,

    /// Path (or bare command name) of the binary if found
    pub adb_path: Option<String>,
}

impl AdbAvailability {
    /// Check adb availability (run once at startup)
    pub async fn check() -> Self {
        for path in Self::candidate_paths() {
            if Command::new(&path)
                .arg("version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map(|s| s.success())
                .inspect_err(|e| tracing::debug!("adb check failed for {}: {}", path, e))
                .unwrap_or(false)
            {
                return Self {
                    available: true,
                    adb_path: Some(path),
                };
            }
        }

        Self::default()
    }

    /// Get list of paths to try for the adb command
    fn candidate_paths() -> Vec<String> {
        let mut paths = vec!["adb".to_string()];

        // Check ANDROID_HOME/platform-tools/adb
        if let Ok(android_home) = std::env::var("ANDROID_HOME") {
            paths.push(format!("{}/platform-tools/adb", android_home));
        }

        // Check ANDROID_SDK_ROOT/platform-tools/adb
        if let Ok(sdk_root) = std::env::var("ANDROID_SDK_ROOT") {
            paths.push(format!("{}/platform-tools/adb", sdk_root));
        }

        paths
    }

    /// Get user-friendly message when adb is unavailable
    pub fn unavailable_message(&self) -> Option<&'static str> {
        if self.available {
            None
        } else {
            Some("adb not found. Install Android platform-tools or set ANDROID_HOME.")
        }
    }
}
