//! Config file watcher for external-edit reload
//!
//! Watches the config file's directory and reloads the shared handle when
//! the file changes on disk, so hand edits take effect without a restart.

use std::path::PathBuf;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tracing::{debug, error, info, warn};

use super::settings::ConfigHandle;

/// Debounce duration for config file events
const DEBOUNCE_MS: u64 = 500;

/// Watches the config file backing a [`ConfigHandle`] and reloads it on change.
pub struct ConfigWatcher {
    handle: ConfigHandle,
    /// Handle to stop the watcher
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl ConfigWatcher {
    pub fn new(handle: ConfigHandle) -> Self {
        Self {
            handle,
            stop_tx: None,
        }
    }

    /// Start watching. A handle without a backing file is a no-op.
    pub fn start(&mut self) {
        if self.stop_tx.is_some() {
            debug!("Config watcher already running");
            return;
        }
        let Some(path) = self.handle.path().map(PathBuf::from) else {
            debug!("Config handle has no backing file, not watching");
            return;
        };

        let handle = self.handle.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        // The notify backend is callback-driven and blocking; park it on a
        // blocking task like the rest of the runtime expects.
        tokio::task::spawn_blocking(move || {
            Self::run_watcher(path, handle, stop_rx);
        });
    }

    /// Stop the watcher
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    fn run_watcher(
        config_path: PathBuf,
        handle: ConfigHandle,
        mut stop_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        let file_name = config_path.file_name().map(|n| n.to_os_string());
        let reload_handle = handle.clone();

        let debouncer_result = new_debouncer(
            Duration::from_millis(DEBOUNCE_MS),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    // Only the config file itself is interesting; the watch
                    // covers the whole directory because editors replace
                    // files rather than write in place.
                    let relevant = events.iter().any(|event| {
                        event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
                    });
                    if !relevant {
                        return;
                    }

                    match reload_handle.reload() {
                        Ok(()) => debug!("Config reloaded after file change"),
                        Err(e) => warn!("Config file changed but reload failed: {}", e),
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!("Config watcher error: {:?}", error);
                    }
                }
            },
        );

        let mut debouncer = match debouncer_result {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to create config watcher: {}", e);
                return;
            }
        };

        let watch_dir = config_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        if let Err(e) = debouncer.watch(&watch_dir, RecursiveMode::NonRecursive) {
            warn!("Failed to watch {}: {}", watch_dir.display(), e);
            return;
        }
        info!("Watching config: {}", config_path.display());

        // Keep running until stop signal
        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    info!("Config watcher stopping");
                    break;
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
