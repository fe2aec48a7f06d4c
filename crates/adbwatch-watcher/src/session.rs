//! Monitoring session lifecycle
//!
//! One [`MonitorSession`] owns the whole watch: it resolves the target,
//! establishes the transport, pumps the log stream through the event
//! pipeline, and keeps reconnecting with bounded backoff until told to
//! stop. All mutable lifecycle state sits behind a single session-level
//! lock so `start`/`stop`/`restart` can never race two readers against the
//! same transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use adbwatch_adb::{AdbSource, LogSource, LogcatStream};
use adbwatch_core::prelude::*;
use adbwatch_core::{AdbEvent, DeviceTarget};

use crate::config::ConfigHandle;
use crate::cooldown::CooldownFilter;
use crate::dispatch::Notifier;
use crate::pipeline::EventPipeline;
use crate::status::StatusBoard;

/// First reconnect delay after a drop
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Reconnect delay cap
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Interval of the liveness probe while streaming
const PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// How long `stop()` waits for the monitoring task before aborting it
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// The production session type used by the binary and the API layer
pub type AdbMonitorSession = MonitorSession<AdbSource>;

/// Result of a one-shot reachability test (exposed by the API)
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTestReport {
    pub status: String,
    pub message: String,
    pub device_id: Option<String>,
}

impl ConnectionTestReport {
    fn success(target: &DeviceTarget) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("Successfully connected to device {}", target),
            device_id: Some(target.as_str().to_string()),
        }
    }

    fn error(message: String, device_id: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            message,
            device_id,
        }
    }
}

/// Lifecycle state guarded by the session lock
#[derive(Default)]
struct SessionInner {
    /// The monitoring loop task, while running
    task: Option<JoinHandle<()>>,
    /// Sending `true` stops the loop at the next event or backoff boundary
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Target of the current/most recent run, for `restart()`
    last_target: Option<DeviceTarget>,
}

/// The monitoring session: transport lifecycle plus the event pipeline.
pub struct MonitorSession<S: LogSource> {
    source: Arc<S>,
    config: ConfigHandle,
    status: Arc<StatusBoard>,
    /// Survives reconnects and restarts so a restart cannot re-notify
    /// within an open cooldown window
    cooldown: Arc<Mutex<CooldownFilter>>,
    notifier: Notifier,
    inner: tokio::sync::Mutex<SessionInner>,
}

impl<S: LogSource> MonitorSession<S> {
    pub fn new(source: S, config: ConfigHandle) -> Self {
        Self {
            source: Arc::new(source),
            config,
            status: Arc::new(StatusBoard::new()),
            cooldown: Arc::new(Mutex::new(CooldownFilter::new())),
            notifier: Notifier::new(),
            inner: tokio::sync::Mutex::new(SessionInner::default()),
        }
    }

    /// The observable state written by this session
    pub fn status_board(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Start monitoring.
    ///
    /// Resolves the target (discovering the sole attached device when none
    /// is configured) and establishes the transport synchronously: a
    /// device that cannot be reached fails here, at the caller. Once the
    /// first reader is up, all further failures are absorbed by the
    /// reconnect loop. Idempotent while running.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.start_locked(&mut inner, None).await
    }

    /// Stop monitoring. Idempotent: terminates the reader and the loop,
    /// releases the transport, and clears every health flag.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        self.stop_locked(&mut inner).await;
    }

    /// `stop()` followed by `start()` against the last-used target.
    pub async fn restart(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        info!("Restarting monitoring");
        self.stop_locked(&mut inner).await;
        let last_target = inner.last_target.clone();
        self.start_locked(&mut inner, last_target).await
    }

    /// Whether the monitoring loop is currently running
    pub async fn is_running(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Whether the transport currently reaches the device
    pub fn is_connected(&self) -> bool {
        self.status.state().device_connected
    }

    /// One-shot reachability test, independent of the monitoring loop.
    pub async fn test_connection(&self) -> ConnectionTestReport {
        let settings = self.config.current();
        let target = match self.source.resolve(settings.device_target()).await {
            Ok(target) => target,
            Err(e) => return ConnectionTestReport::error(e.to_string(), None),
        };

        match self.source.connect(&target).await {
            Ok(()) => ConnectionTestReport::success(&target),
            Err(e) => {
                ConnectionTestReport::error(e.to_string(), Some(target.as_str().to_string()))
            }
        }
    }

    async fn start_locked(
        &self,
        inner: &mut SessionInner,
        target_override: Option<DeviceTarget>,
    ) -> Result<()> {
        if inner.task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Monitoring already running");
            return Ok(());
        }

        let settings = self.config.current();
        let target = match target_override {
            Some(target) => target,
            None => match self.source.resolve(settings.device_target()).await {
                Ok(target) => target,
                Err(e) => {
                    self.status.start_failed(settings.device_target());
                    return Err(e);
                }
            },
        };

        // Compile the pattern before touching the device so a broken
        // configuration surfaces synchronously.
        let pipeline = EventPipeline::new(
            self.config.clone(),
            Arc::clone(&self.status),
            Arc::clone(&self.cooldown),
            self.notifier.clone(),
        )?;

        if let Err(e) = self.source.connect(&target).await {
            error!("Could not connect to {}: {}", target, e);
            self.status.start_failed(Some(target.as_str()));
            return Err(e);
        }
        self.status.session_started(target.as_str());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.source),
            target.clone(),
            self.config.clone(),
            Arc::clone(&self.status),
            pipeline,
            shutdown_rx,
        ));

        inner.task = Some(task);
        inner.shutdown_tx = Some(shutdown_tx);
        inner.last_target = Some(target);
        info!("Monitoring started");
        Ok(())
    }

    async fn stop_locked(&self, inner: &mut SessionInner) {
        if let Some(tx) = inner.shutdown_tx.take() {
            let _ = tx.send(true);
        }

        if let Some(mut task) = inner.task.take() {
            if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
                warn!("Monitoring task did not stop in time, aborting it");
                task.abort();
            }
        }

        self.status.stopped();
        info!("Monitoring stopped");
    }
}

/// Why one stream pump ended
enum PumpEnd {
    /// `stop()` was requested
    Shutdown,
    /// The stream died or the device stopped answering; reconnect
    Disconnected,
}

/// The reconnect state machine: Connected -> Disconnected -> Connecting ->
/// Connected, driven until shutdown. Entered with the transport already
/// established by `start()`.
async fn run_loop<S: LogSource>(
    source: Arc<S>,
    target: DeviceTarget,
    config: ConfigHandle,
    status: Arc<StatusBoard>,
    mut pipeline: EventPipeline,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut backoff = INITIAL_BACKOFF;
    let mut connected = true;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        if !connected {
            match source.connect(&target).await {
                Ok(()) => {
                    info!("Reconnected to {}", target);
                    status.reconnected();
                    connected = true;
                    backoff = INITIAL_BACKOFF;
                }
                Err(e) => {
                    debug!("Reconnect to {} failed: {}", target, e);
                    if wait_or_shutdown(&mut shutdown_rx, backoff).await {
                        break;
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            }
        }

        // Filter settings are re-read here so logcat filter changes apply
        // on the next (re)connect.
        let filter = config.current().logcat_filter();
        let stream = match source.stream(&target, &filter).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to start log stream on {}: {}", target, e);
                status.connection_lost();
                connected = false;
                if wait_or_shutdown(&mut shutdown_rx, backoff).await {
                    break;
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };

        match pump_stream(stream, &source, &target, &mut pipeline, &mut shutdown_rx).await {
            PumpEnd::Shutdown => break,
            PumpEnd::Disconnected => {
                warn!("Log stream from {} ended, reconnecting", target);
                status.connection_lost();
                connected = false;
                if wait_or_shutdown(&mut shutdown_rx, backoff).await {
                    break;
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }

    debug!("Monitoring loop exited");
}

/// Drain one stream until it ends, the probe fails, or shutdown is
/// requested. At most one of these pumps runs per session.
async fn pump_stream<S: LogSource>(
    mut stream: LogcatStream,
    source: &Arc<S>,
    target: &DeviceTarget,
    pipeline: &mut EventPipeline,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> PumpEnd {
    // Periodic liveness check: logcat over TCP can hang silently when the
    // device goes away, without ever closing the pipe.
    let mut probe_tick =
        tokio::time::interval_at(tokio::time::Instant::now() + PROBE_INTERVAL, PROBE_INTERVAL);
    probe_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    stream.shutdown().await;
                    return PumpEnd::Shutdown;
                }
            }
            event = stream.next_event() => match event {
                Some(AdbEvent::Line(line)) => pipeline.handle_line(line).await,
                Some(AdbEvent::Stderr(line)) => debug!("logcat stderr: {}", line),
                Some(AdbEvent::Exited { code }) => {
                    warn!("Logcat process exited with code {:?}", code);
                    return PumpEnd::Disconnected;
                }
                None => return PumpEnd::Disconnected,
            },
            _ = probe_tick.tick() => {
                if !source.is_alive(target).await {
                    warn!("Liveness probe of {} failed", target);
                    stream.shutdown().await;
                    return PumpEnd::Disconnected;
                }
            }
        }
    }
}

/// Sleep `delay`, returning early with `true` when shutdown is requested.
/// This is what makes the backoff cancellable at every boundary.
async fn wait_or_shutdown(shutdown_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        result = shutdown_rx.changed() => result.is_err() || *shutdown_rx.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use adbwatch_adb::LogcatFilter;
    use adbwatch_core::{RawLine, SessionState};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    const START_LINE: &str = "START u0 {act=android.intent.action.VIEW \
        dat=/storage/emulated/0/Movies/e01.mkv typ=video/mp4 \
        cmp=org.videolan.vlc/.StartActivity}";

    #[derive(Default)]
    struct FakeInner {
        connect_fails: AtomicBool,
        dead: AtomicBool,
        connects: AtomicUsize,
        streams: AtomicUsize,
        line_tx: Mutex<Option<mpsc::Sender<AdbEvent>>>,
    }

    /// Scripted transport: the test holds the sender side of the current
    /// stream and can drop it to simulate EOF.
    #[derive(Clone, Default)]
    struct FakeSource {
        inner: Arc<FakeInner>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self::default()
        }

        fn set_connect_fails(&self, fails: bool) {
            self.inner.connect_fails.store(fails, Ordering::SeqCst);
        }

        fn set_dead(&self, dead: bool) {
            self.inner.dead.store(dead, Ordering::SeqCst);
        }

        fn streams(&self) -> usize {
            self.inner.streams.load(Ordering::SeqCst)
        }

        async fn send_line(&self, text: &str) {
            let tx = self
                .inner
                .line_tx
                .lock()
                .unwrap()
                .clone()
                .expect("no active stream");
            tx.send(AdbEvent::Line(RawLine::new(text))).await.unwrap();
        }

        /// Simulate the logcat process dying: EOF on the event channel
        fn kill_stream(&self) {
            self.inner.line_tx.lock().unwrap().take();
        }
    }

    impl LogSource for FakeSource {
        async fn resolve(&self, configured: Option<&str>) -> Result<DeviceTarget> {
            Ok(DeviceTarget::new(configured.unwrap_or("fake-device")))
        }

        async fn connect(&self, target: &DeviceTarget) -> Result<()> {
            self.inner.connects.fetch_add(1, Ordering::SeqCst);
            if self.inner.connect_fails.load(Ordering::SeqCst) {
                Err(Error::no_device(Some(target.as_str())))
            } else {
                Ok(())
            }
        }

        async fn is_alive(&self, _target: &DeviceTarget) -> bool {
            !self.inner.dead.load(Ordering::SeqCst)
        }

        async fn stream(
            &self,
            _target: &DeviceTarget,
            _filter: &LogcatFilter,
        ) -> Result<LogcatStream> {
            let (tx, rx) = mpsc::channel(64);
            *self.inner.line_tx.lock().unwrap() = Some(tx);
            self.inner.streams.fetch_add(1, Ordering::SeqCst);
            Ok(LogcatStream::from_parts(rx, None))
        }
    }

    fn session(source: FakeSource) -> MonitorSession<FakeSource> {
        MonitorSession::new(source, ConfigHandle::in_memory(Settings::default()))
    }

    /// Poll the status board until `predicate` holds or the deadline passes.
    async fn wait_for_state(
        session: &MonitorSession<FakeSource>,
        predicate: impl Fn(&SessionState) -> bool,
    ) {
        for _ in 0..200 {
            if predicate(&session.status_board().state()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "state predicate never held; last state: {:?}",
            session.status_board().state()
        );
    }

    #[tokio::test]
    async fn test_start_connects_and_reports_running() {
        let source = FakeSource::new();
        let session = session(source.clone());

        session.start().await.unwrap();

        let state = session.status_board().state();
        assert!(state.running);
        assert!(state.device_connected);
        assert!(!state.monitoring_failed);
        assert_eq!(state.device_id.as_deref(), Some("fake-device"));
        assert!(session.is_running().await);
        assert!(session.is_connected());
        assert_eq!(source.streams(), 1);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_start_failure_surfaces_synchronously() {
        let source = FakeSource::new();
        source.set_connect_fails(true);
        let session = session(source.clone());

        let err = session.start().await.unwrap_err();
        assert!(err.is_recoverable());

        let state = session.status_board().state();
        assert!(!state.running);
        assert!(state.monitoring_failed);
        assert!(!session.is_running().await);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_running() {
        let source = FakeSource::new();
        let session = session(source.clone());

        session.start().await.unwrap();
        session.start().await.unwrap();

        // a second start must not spawn a second reader
        assert_eq!(source.streams(), 1);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_stream_end_keeps_running_but_marks_failed() {
        let source = FakeSource::new();
        let session = session(source.clone());
        session.start().await.unwrap();

        // further connects fail so the session stays in the backoff phase
        source.set_connect_fails(true);
        source.kill_stream();

        wait_for_state(&session, |s| {
            s.running && !s.device_connected && s.monitoring_failed
        })
        .await;

        session.stop().await;
        let state = session.status_board().state();
        assert!(!state.running);
        assert!(!state.device_connected);
        assert!(!state.monitoring_failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_reconnects_after_stream_end() {
        let source = FakeSource::new();
        let session = session(source.clone());
        session.start().await.unwrap();
        assert_eq!(source.streams(), 1);

        source.kill_stream();

        // the loop backs off, reconnects, and opens a fresh stream
        wait_for_state(&session, |s| s.device_connected && !s.monitoring_failed).await;
        for _ in 0..200 {
            if source.streams() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(source.streams(), 2);

        session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_triggers_reconnect() {
        let source = FakeSource::new();
        let session = session(source.clone());
        session.start().await.unwrap();

        // the device goes silent without closing the stream: only the
        // periodic probe can notice
        source.set_dead(true);
        source.set_connect_fails(true);

        // the probe fires well past the polling horizon of wait_for_state,
        // so step virtual time in whole seconds here
        for _ in 0..200 {
            if session.status_board().state().monitoring_failed {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert!(session.status_board().state().monitoring_failed);

        // device comes back
        source.set_dead(false);
        source.set_connect_fails(false);
        for _ in 0..200 {
            let state = session.status_board().state();
            if state.device_connected && !state.monitoring_failed {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert!(session.status_board().state().device_connected);

        session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_backoff() {
        let source = FakeSource::new();
        let session = session(source.clone());
        session.start().await.unwrap();

        source.set_connect_fails(true);
        source.kill_stream();
        wait_for_state(&session, |s| s.monitoring_failed).await;

        // the loop is inside its backoff sleep; stop must end it promptly
        session.stop().await;
        assert!(!session.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let source = FakeSource::new();
        let session = session(source.clone());

        // stop before any start is a no-op
        session.stop().await;

        session.start().await.unwrap();
        session.stop().await;
        session.stop().await;

        let state = session.status_board().state();
        assert!(!state.running);
    }

    #[tokio::test]
    async fn test_restart_reuses_last_target() {
        let source = FakeSource::new();
        let config = ConfigHandle::in_memory({
            let mut s = Settings::default();
            s.device.target = "192.168.1.50:5555".to_string();
            s
        });
        let session = MonitorSession::new(source.clone(), config);

        session.start().await.unwrap();
        session.stop().await;

        // clear the configured target; restart must still use the last one
        let mut settings = session.config().current();
        settings.device.target = String::new();
        session.config().update(settings).unwrap();

        session.restart().await.unwrap();
        let state = session.status_board().state();
        assert!(state.running);
        assert_eq!(state.device_id.as_deref(), Some("192.168.1.50:5555"));

        session.stop().await;
    }

    #[tokio::test]
    async fn test_lines_flow_into_records() {
        let source = FakeSource::new();
        let session = session(source.clone());
        session.start().await.unwrap();

        source.send_line(START_LINE).await;

        for _ in 0..200 {
            if !session.status_board().recent_records(10).is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let records = session.status_board().recent_records(10);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].source_path,
            "/storage/emulated/0/Movies/e01.mkv"
        );

        session.stop().await;
    }

    #[tokio::test]
    async fn test_connection_report() {
        let source = FakeSource::new();
        let session = session(source.clone());

        let report = session.test_connection().await;
        assert_eq!(report.status, "success");
        assert_eq!(report.device_id.as_deref(), Some("fake-device"));

        source.set_connect_fails(true);
        let report = session.test_connection().await;
        assert_eq!(report.status, "error");
    }
}
