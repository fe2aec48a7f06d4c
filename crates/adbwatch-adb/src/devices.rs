//! Device discovery using `adb devices -l`

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use adbwatch_core::prelude::*;
use adbwatch_core::DeviceTarget;

/// Default timeout for the adb devices command
const DEVICES_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection state of an attached device, as reported by the adb server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Attached and usable
    Device,
    /// Attached but not responding
    Offline,
    /// Attached but the host key was not accepted on the device
    Unauthorized,
    /// Anything else adb may report (e.g. `recovery`, `sideload`)
    Other(String),
}

impl DeviceState {
    fn parse(s: &str) -> Self {
        match s {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

/// An attached adb device
#[derive(Debug, Clone)]
pub struct AdbDevice {
    /// Serial or `host:port` identifier
    pub serial: String,

    /// Connection state
    pub state: DeviceState,

    /// Model name from the `-l` long listing, when present
    pub model: Option<String>,
}

impl AdbDevice {
    /// Whether this device can be monitored right now
    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Device
    }
}

/// Discover attached devices using `adb devices -l`
pub async fn discover_devices(adb_path: &str) -> Result<Vec<AdbDevice>> {
    let output = timeout(DEVICES_TIMEOUT, run_adb_devices(adb_path))
        .await
        .map_err(|_| Error::connection("adb devices timed out"))??;

    Ok(parse_devices_output(&output))
}

/// Pick the sole ready device, used when no target is configured.
///
/// Errors when nothing is attached or when the choice would be ambiguous.
pub async fn discover_sole_device(adb_path: &str) -> Result<DeviceTarget> {
    let devices = discover_devices(adb_path).await?;
    let ready: Vec<_> = devices.iter().filter(|d| d.is_ready()).collect();

    match ready.len() {
        0 => Err(Error::no_device(None)),
        1 => Ok(DeviceTarget::new(ready[0].serial.clone())),
        n => Err(Error::AmbiguousDevice { count: n }),
    }
}

async fn run_adb_devices(adb_path: &str) -> Result<String> {
    let output = Command::new(adb_path)
        .args(["devices", "-l"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::AdbNotFound
            } else {
                Error::connection(format!("Failed to run adb devices: {}", e))
            }
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    debug!("adb devices stdout: {}", stdout);
    if !stderr.is_empty() {
        debug!("adb devices stderr: {}", stderr);
    }

    // adb restarts its server on first use and still prints the listing,
    // so only a missing listing counts as failure
    if !output.status.success() && !stdout.contains("List of devices") {
        return Err(Error::connection(format!(
            "adb devices failed with exit code {:?}: {}",
            output.status.code(),
            stderr
        )));
    }

    Ok(stdout)
}

/// Parse the tabular output of `adb devices -l`
///
/// The header line, daemon-start banners, and empty lines are skipped;
/// every remaining line is `<serial> <state> [key:value ...]`.
fn parse_devices_output(output: &str) -> Vec<AdbDevice> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with("List of devices")
                || line.starts_with('*')
                || line.starts_with("adb server")
            {
                return None;
            }

            let mut parts = line.split_whitespace();
            let serial = parts.next()?.to_string();
            let state = DeviceState::parse(parts.next()?);
            let model = parts
                .find_map(|p| p.strip_prefix("model:"))
                .map(str::to_string);

            Some(AdbDevice {
                serial,
                state,
                model,
            })
        })
        .collect()
}
