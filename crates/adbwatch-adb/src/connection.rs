//! Connection establishment and liveness probing
//!
//! TCP targets (`host:port`) go through `adb connect` before use; USB
//! serials are attached by the adb server itself and only need a probe.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use adbwatch_core::prelude::*;
use adbwatch_core::DeviceTarget;

/// Timeout for `adb connect`
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the shell echo probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Establish (or re-establish) the transport to `target`.
///
/// Succeeds only once the device answers a shell probe, so a stale
/// `already connected` entry in the adb server does not count.
pub async fn connect(adb_path: &str, target: &DeviceTarget) -> Result<()> {
    if target.is_tcp() {
        adb_connect(adb_path, target).await?;
    }

    if probe(adb_path, target).await {
        Ok(())
    } else {
        Err(Error::no_device(Some(target.as_str())))
    }
}

/// Cheap liveness check: `adb -s <target> shell echo ping`.
pub async fn probe(adb_path: &str, target: &DeviceTarget) -> bool {
    let result = timeout(
        PROBE_TIMEOUT,
        Command::new(adb_path)
            .args(["-s", target.as_str(), "shell", "echo", "ping"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output(),
    )
    .await;

    match result {
        Ok(Ok(output)) => {
            output.status.success() && String::from_utf8_lossy(&output.stdout).contains("ping")
        }
        Ok(Err(e)) => {
            debug!("Probe of {} failed to run: {}", target, e);
            false
        }
        Err(_) => {
            debug!("Probe of {} timed out", target);
            false
        }
    }
}

/// Run `adb connect host:port` and check the textual verdict.
///
/// adb exits 0 even on failure, so the stdout text is the only signal.
async fn adb_connect(adb_path: &str, target: &DeviceTarget) -> Result<()> {
    let output = timeout(
        CONNECT_TIMEOUT,
        Command::new(adb_path)
            .args(["connect", target.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| Error::connection(format!("adb connect to {} timed out", target)))?
    .map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::AdbNotFound
        } else {
            Error::connection(format!("Failed to run adb connect: {}", e))
        }
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
    debug!("adb connect {}: {}", target, stdout.trim());

    if stdout.contains("connected") {
        Ok(())
    } else {
        Err(Error::connection(format!(
            "adb connect to {} refused: {}",
            target,
            stdout.trim()
        )))
    }
}
