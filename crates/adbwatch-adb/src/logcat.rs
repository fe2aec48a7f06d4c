//! Logcat child process management

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::timeout;

use adbwatch_core::prelude::*;
use adbwatch_core::{AdbEvent, DeviceTarget, RawLine};

/// Source-side filter applied to the logcat stream.
///
/// Narrowing at the device keeps the line volume down before anything
/// reaches the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogcatFilter {
    /// Log buffer to read (`system`, `main`, `events`, ...)
    pub buffer: String,
    /// Tag filter spec, e.g. `ActivityTaskManager:I`
    pub tags: String,
    /// Content match passed as `logcat -e`; empty = no content filter
    pub pattern: String,
}

impl Default for LogcatFilter {
    fn default() -> Self {
        Self {
            buffer: "system".to_string(),
            tags: "ActivityTaskManager:I".to_string(),
            pattern: String::new(),
        }
    }
}

impl LogcatFilter {
    /// Build the argument list for `adb -s <target> logcat ...`
    fn to_args(&self, target: &DeviceTarget) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            target.as_str().to_string(),
            "logcat".to_string(),
            format!("--buffer={}", self.buffer),
        ];
        if !self.tags.is_empty() {
            args.push(self.tags.clone());
            args.push("*:S".to_string());
        }
        if !self.pattern.is_empty() {
            args.push("-e".to_string());
            args.push(self.pattern.clone());
        }
        args
    }
}

/// Clear the device-side logcat ring buffer so historical events are not
/// replayed when streaming starts. Best-effort: a failure is logged and
/// streaming proceeds.
pub async fn clear_buffer(adb_path: &str, target: &DeviceTarget, buffer: &str) {
    let result = timeout(
        Duration::from_secs(5),
        Command::new(adb_path)
            .args([
                "-s",
                target.as_str(),
                "logcat",
                &format!("--buffer={}", buffer),
                "-c",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status(),
    )
    .await;

    match result {
        Ok(Ok(status)) if status.success() => debug!("Cleared logcat buffer on {}", target),
        Ok(Ok(status)) => warn!("logcat -c on {} exited with {:?}", target, status.code()),
        Ok(Err(e)) => warn!("logcat -c on {} failed to run: {}", target, e),
        Err(_) => warn!("logcat -c on {} timed out", target),
    }
}

/// Manages an `adb logcat` child process.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` background
/// task that calls `child.wait()`, so the real exit code is captured and
/// emitted as `AdbEvent::Exited { code: Some(N) }` rather than always `None`.
///
/// `LogcatProcess` retains a kill channel to request a force-kill, an
/// atomic flag for synchronous `has_exited()` checks, and a [`Notify`]
/// handle so `shutdown()` can await the exit without holding a lock across
/// `.await`.
pub struct LogcatProcess {
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to force-kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
    /// Notified by the wait task immediately after the child exits.
    exit_notify: Arc<Notify>,
}

impl LogcatProcess {
    /// Spawn `adb logcat` against `target` with the given source filter.
    ///
    /// Events are sent to `event_tx` for processing by the monitor session.
    pub fn spawn(
        adb_path: &str,
        target: &DeviceTarget,
        filter: &LogcatFilter,
        event_tx: mpsc::Sender<AdbEvent>,
    ) -> Result<Self> {
        let args = filter.to_args(target);
        info!("Spawning logcat: {} {}", adb_path, args.join(" "));

        let mut child = Command::new(adb_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::AdbNotFound
                } else {
                    Error::process_spawn(e.to_string())
                }
            })?;

        let pid = child.id();
        info!("Logcat process started with PID: {:?}", pid);

        // Spawn stdout reader task (does not emit Exited — that's the wait task's job)
        let stdout = child.stdout.take().expect("stdout was configured");
        tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));

        // Spawn stderr reader task
        let stderr = child.stderr.take().expect("stderr was configured");
        tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        // Shared exit-state primitives
        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());

        // Kill channel: LogcatProcess holds the sender, wait task holds the receiver.
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // Spawn the dedicated wait task — takes ownership of `child`.
        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Background task: owns `child`, waits for it to exit, emits `AdbEvent::Exited`.
    ///
    /// Two ways the task can end:
    /// 1. The logcat process exits naturally — `child.wait()` resolves.
    /// 2. `kill_rx` fires — we kill the child first, then wait for it.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<AdbEvent>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        let code: Option<i32> = tokio::select! {
            // Natural exit path
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Logcat process exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for logcat process: {}", e);
                        None
                    }
                }
            }
            // Force-kill path: kill_tx was sent (by shutdown or drop)
            _ = kill_rx => {
                debug!("Kill signal received, terminating logcat process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill logcat process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // Mark process as exited and wake any waiters before sending the event.
        // This order ensures `has_exited()` is true before callers observe the event.
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();

        let _ = event_tx.send(AdbEvent::Exited { code }).await;
    }

    /// Read lines from stdout and send as `AdbEvent::Line`.
    ///
    /// Logcat output is not guaranteed to be valid UTF-8 (app tags and
    /// intent extras can carry arbitrary bytes), so lines are framed with
    /// `read_until` and decoded lossily. A garbled line yields replacement
    /// characters; it never aborts the stream.
    async fn stdout_reader(stdout: tokio::process::ChildStdout, tx: mpsc::Sender<AdbEvent>) {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let text = text.trim_end_matches(['\r', '\n']);
                    if text.is_empty() {
                        continue;
                    }
                    trace!("logcat: {}", text);

                    if tx.send(AdbEvent::Line(RawLine::new(text))).await.is_err() {
                        debug!("line channel closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Error reading logcat stdout: {}", e);
                    break;
                }
            }
        }

        // Stdout EOF just means the pipe closed; the wait_for_exit task
        // will emit AdbEvent::Exited with the real exit code.
        info!("logcat stdout reader finished, process likely exiting");
    }

    /// Read lines from stderr and forward as AdbEvents
    async fn stderr_reader(stderr: tokio::process::ChildStderr, tx: mpsc::Sender<AdbEvent>) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("logcat stderr: {}", line);

            if tx.send(AdbEvent::Stderr(line)).await.is_err() {
                debug!("stderr channel closed");
                break;
            }
        }

        debug!("logcat stderr reader finished");
    }

    /// Shut down the logcat process.
    ///
    /// 1. Early exit if the process is already dead (atomic check — no lock)
    /// 2. Send the kill signal to the wait task
    /// 3. Wait up to 2s for the exit notification
    pub async fn shutdown(&mut self) {
        // Fast path: if process already exited, we're done
        if self.has_exited() {
            debug!("Logcat process already exited, skipping kill");
            return;
        }

        // Race-free pattern: create the `notified()` future BEFORE the final
        // `has_exited()` check, so we cannot miss a notification that fires
        // between the check and the await.
        let notified = self.exit_notify.notified();

        if let Some(tx) = self.kill_tx.take() {
            // Ignore send error — the wait task may have already exited naturally.
            let _ = tx.send(());
        }

        if self.has_exited() {
            return;
        }

        if timeout(Duration::from_secs(2), notified).await.is_err() {
            warn!("Timeout waiting for logcat process to exit");
        }
    }

    /// Check if the process has already exited.
    ///
    /// Non-blocking, synchronous check backed by an atomic flag set by the
    /// `wait_for_exit` task.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Check if the process is still running.
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for LogcatProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            // Send kill signal so the wait task tears down the child cleanly.
            // If kill_tx was already consumed by shutdown(), this is a no-op.
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
        // kill_on_drop(true) on the Child is the final safety net if the
        // wait task hasn't had a chance to handle the kill yet.
        debug!("LogcatProcess dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_args_full() {
        let filter = LogcatFilter {
            buffer: "system".to_string(),
            tags: "ActivityTaskManager:I".to_string(),
            pattern: "START .*cmp=".to_string(),
        };
        let target = DeviceTarget::new("emulator-5554");

        let args = filter.to_args(&target);
        assert_eq!(
            args,
            vec![
                "-s",
                "emulator-5554",
                "logcat",
                "--buffer=system",
                "ActivityTaskManager:I",
                "*:S",
                "-e",
                "START .*cmp=",
            ]
        );
    }

    #[test]
    fn test_filter_args_without_pattern_or_tags() {
        let filter = LogcatFilter {
            buffer: "main".to_string(),
            tags: String::new(),
            pattern: String::new(),
        };
        let target = DeviceTarget::new("emulator-5554");

        let args = filter.to_args(&target);
        assert_eq!(args, vec!["-s", "emulator-5554", "logcat", "--buffer=main"]);
    }

    /// Helper: spawn a short-lived real process (not adb) using the internal
    /// machinery. We use `sh -c` as a stand-in for the logcat child.
    fn spawn_test_process(script: &str, event_tx: mpsc::Sender<AdbEvent>) -> LogcatProcess {
        let mut child = Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("sh must be available in test environment");

        let pid = child.id();

        let stdout = child.stdout.take().expect("stdout");
        tokio::spawn(LogcatProcess::stdout_reader(stdout, event_tx.clone()));

        let stderr = child.stderr.take().expect("stderr");
        tokio::spawn(LogcatProcess::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(LogcatProcess::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        LogcatProcess {
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        }
    }

    async fn collect_events(rx: &mut mpsc::Receiver<AdbEvent>) -> Vec<AdbEvent> {
        let mut events = Vec::new();
        loop {
            match timeout(Duration::from_millis(500), rx.recv()).await {
                Ok(Some(event)) => {
                    let exited = matches!(event, AdbEvent::Exited { .. });
                    events.push(event);
                    if exited {
                        break;
                    }
                }
                _ => break,
            }
        }
        events
    }

    #[tokio::test]
    async fn test_exit_code_captured() {
        let (tx, mut rx) = mpsc::channel(16);
        let _process = spawn_test_process("exit 42", tx);

        let events = collect_events(&mut rx).await;
        let code = events.iter().find_map(|e| match e {
            AdbEvent::Exited { code } => Some(*code),
            _ => None,
        });
        assert_eq!(code, Some(Some(42)));
    }

    #[tokio::test]
    async fn test_lines_are_streamed_before_exit() {
        let (tx, mut rx) = mpsc::channel(16);
        let _process = spawn_test_process("printf 'one\\ntwo\\n'", tx);

        let events = collect_events(&mut rx).await;
        let lines: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AdbEvent::Line(l) => Some(l.text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let (tx, mut rx) = mpsc::channel(16);
        // octal 377/376 = 0xFF 0xFE, invalid UTF-8
        let _process = spawn_test_process("printf 'ok \\377\\376 tail\\n'", tx);

        let events = collect_events(&mut rx).await;
        let line = events
            .iter()
            .find_map(|e| match e {
                AdbEvent::Line(l) => Some(l.text.clone()),
                _ => None,
            })
            .expect("line should still be delivered");
        assert!(line.starts_with("ok"));
        assert!(line.ends_with("tail"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_exactly_one_exited_event() {
        let (tx, mut rx) = mpsc::channel(32);
        let _process = spawn_test_process("exit 0", tx);

        let events = collect_events(&mut rx).await;
        let exited_count = events
            .iter()
            .filter(|e| matches!(e, AdbEvent::Exited { .. }))
            .count();
        assert_eq!(exited_count, 1);
    }

    #[tokio::test]
    async fn test_shutdown_kills_long_running_process() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut process = spawn_test_process("sleep 60", tx);

        assert!(process.is_running());
        process.shutdown().await;

        let events = collect_events(&mut rx).await;
        assert!(events.iter().any(|e| matches!(e, AdbEvent::Exited { .. })));
        assert!(process.has_exited());
    }

    #[tokio::test]
    async fn test_has_exited_after_natural_exit() {
        let (tx, mut rx) = mpsc::channel(16);
        let process = spawn_test_process("exit 0", tx);

        let _ = collect_events(&mut rx).await;
        assert!(process.has_exited());
        assert!(!process.is_running());
    }
}
