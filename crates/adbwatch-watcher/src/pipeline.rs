//! Per-line event pipeline
//!
//! Glue between the transport's raw lines and the record history:
//! extract → cooldown → map → notify, with every stage's outcome recorded
//! on the status board. Settings are re-read per line so config changes
//! apply to the next event without a restart.

use std::sync::{Arc, Mutex};

use adbwatch_core::prelude::*;
use adbwatch_core::{LogRecord, MappedEvent, NotificationOutcome, RawLine};

use crate::config::ConfigHandle;
use crate::cooldown::CooldownFilter;
use crate::dispatch::Notifier;
use crate::extract::EventExtractor;
use crate::mapping::map_path;
use crate::status::StatusBoard;

/// Processes raw lines into event records.
pub struct EventPipeline {
    config: ConfigHandle,
    status: Arc<StatusBoard>,
    cooldown: Arc<Mutex<CooldownFilter>>,
    notifier: Notifier,
    extractor: EventExtractor,
}

impl EventPipeline {
    /// Build a pipeline, compiling the configured pattern.
    ///
    /// An invalid pattern fails here, before monitoring starts.
    pub fn new(
        config: ConfigHandle,
        status: Arc<StatusBoard>,
        cooldown: Arc<Mutex<CooldownFilter>>,
        notifier: Notifier,
    ) -> Result<Self> {
        let extractor = EventExtractor::new(&config.current().logcat.pattern)?;
        Ok(Self {
            config,
            status,
            cooldown,
            notifier,
            extractor,
        })
    }

    /// Run one line through the full pipeline.
    pub async fn handle_line(&mut self, line: RawLine) {
        self.status.push_line(line.clone());

        let settings = self.config.current();
        self.refresh_extractor(&settings.logcat.pattern);

        let Some(event) = self.extractor.extract(&line) else {
            return;
        };
        debug!("Detected playback intent: {}", event.source_path);

        let accepted = self
            .cooldown
            .lock()
            .expect("cooldown lock poisoned")
            .accept(&event, settings.cooldown());

        let mapped_path = map_path(&event.source_path, &settings.mappings);
        let mapped = MappedEvent::new(event, mapped_path);

        let outcome = if accepted {
            info!("Playback detected: {}", mapped.mapped_path);
            self.notifier
                .notify(
                    &mapped.mapped_path,
                    settings.notification_endpoint(),
                    settings.notification_timeout(),
                )
                .await
        } else {
            NotificationOutcome::Duplicate
        };

        self.status
            .push_record(LogRecord::new(&mapped, &line.text, outcome));
    }

    /// Recompile the extractor when the configured pattern changed.
    ///
    /// A pattern that no longer compiles keeps the previous extractor; the
    /// config route validates before saving, so this only happens after a
    /// bad hand edit.
    fn refresh_extractor(&mut self, pattern: &str) {
        if pattern == self.extractor.pattern_str() {
            return;
        }
        match EventExtractor::new(pattern) {
            Ok(extractor) => {
                info!("Logcat pattern updated: {}", pattern);
                self.extractor = extractor;
            }
            Err(e) => warn!("Ignoring invalid logcat pattern update: {}", e),
        }
    }
}
