//! Duplicate suppression within a cooldown window
//!
//! Android fires the same playback intent several times in quick
//! succession (activity restarts, resume after rotation), so each accepted
//! source path opens a cooldown window during which repeats are dropped.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};

use adbwatch_core::prelude::*;
use adbwatch_core::PlaybackEvent;

/// Stateful per-path deduplicator.
///
/// The window is measured from the first acceptance in a run: rejected
/// duplicates do not refresh the stored timestamp, so a burst cannot
/// extend its own window.
#[derive(Debug, Default)]
pub struct CooldownFilter {
    last_accepted: HashMap<String, DateTime<Local>>,
}

impl CooldownFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `event` passes the cooldown window.
    ///
    /// Accepts when the path was never seen, or its last acceptance is at
    /// least `window` old; records `observed_at` on acceptance only.
    pub fn accept(&mut self, event: &PlaybackEvent, window: Duration) -> bool {
        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        self.purge_expired(event.observed_at, window);

        let key = event.source_path.as_str();
        match self.last_accepted.get(key) {
            Some(last) if event.observed_at.signed_duration_since(*last) < window => {
                debug!("Suppressing duplicate within cooldown: {}", key);
                false
            }
            _ => {
                self.last_accepted
                    .insert(key.to_string(), event.observed_at);
                true
            }
        }
    }

    /// Drop keys whose window has fully elapsed. Purely a footprint bound;
    /// an expired entry would be accepted anyway.
    fn purge_expired(&mut self, now: DateTime<Local>, window: TimeDelta) {
        self.last_accepted
            .retain(|_, last| now.signed_duration_since(*last) < window);
    }

    /// Number of live keys (expired entries may linger until the next call)
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(3);

    fn event_at(path: &str, at: DateTime<Local>) -> PlaybackEvent {
        PlaybackEvent::new(path, at)
    }

    #[test]
    fn test_first_event_is_accepted() {
        let mut filter = CooldownFilter::new();
        let event = event_at("/a.mkv", Local::now());
        assert!(filter.accept(&event, WINDOW));
    }

    #[test]
    fn test_duplicate_within_window_is_rejected() {
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
        assert!(!filter.accept(&event_at("/a.mkv", t0 + TimeDelta::seconds(1)), WINDOW));
        assert!(!filter.accept(&event_at("/a.mkv", t0 + TimeDelta::seconds(2)), WINDOW));
    }

    #[test]
    fn test_event_outside_window_is_accepted() {
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
        assert!(filter.accept(&event_at("/a.mkv", t0 + TimeDelta::seconds(3)), WINDOW));
    }

    #[test]
    fn test_window_measured_from_first_acceptance() {
        // A rejected duplicate at t0+2 must not push the window out: the
        // event at t0+4 is outside [t0, t0+3) and gets accepted.
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
        assert!(!filter.accept(&event_at("/a.mkv", t0 + TimeDelta::seconds(2)), WINDOW));
        assert!(filter.accept(&event_at("/a.mkv", t0 + TimeDelta::seconds(4)), WINDOW));
    }

    #[test]
    fn test_distinct_paths_do_not_interfere() {
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
        assert!(filter.accept(&event_at("/b.mkv", t0), WINDOW));
        assert!(!filter.accept(&event_at("/a.mkv", t0 + TimeDelta::seconds(1)), WINDOW));
    }

    #[test]
    fn test_stale_keys_are_purged() {
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        filter.accept(&event_at("/a.mkv", t0), WINDOW);
        filter.accept(&event_at("/b.mkv", t0), WINDOW);
        assert_eq!(filter.len(), 2);

        // both windows elapsed by t0+10; the next accept purges them
        filter.accept(&event_at("/c.mkv", t0 + TimeDelta::seconds(10)), WINDOW);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_out_of_order_timestamp_is_rejected() {
        // An event observed before the stored acceptance is inside the
        // window by definition; only strictly newer timestamps can pass.
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
        assert!(!filter.accept(&event_at("/a.mkv", t0 - TimeDelta::seconds(1)), WINDOW));
    }

    #[test]
    fn test_clear_forgets_history() {
        let mut filter = CooldownFilter::new();
        let t0 = Local::now();

        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
        filter.clear();
        assert!(filter.is_empty());
        assert!(filter.accept(&event_at("/a.mkv", t0), WINDOW));
    }
}
