//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/adbwatch/logs/` and mirrored to
/// stderr. Log level is controlled by the `ADBWATCH_LOG` environment
/// variable, falling back to the configured default level.
///
/// # Examples
/// ```bash
/// ADBWATCH_LOG=debug adbwatch
/// ADBWATCH_LOG=trace adbwatch
/// ```
pub fn init(default_level: &str) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "adbwatch.log");

    let env_filter = EnvFilter::try_from_env("ADBWATCH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("adbwatch={},warn", default_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(fmt::time::ChronoLocal::new("%H:%M:%S%.3f".to_string())),
        )
        .init();

    tracing::info!("adbwatch starting");
    tracing::info!("Log directory: {}", log_dir.display());

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("adbwatch").join("logs"))
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> Result<PathBuf> {
    let dir = get_log_directory()?;
    Ok(dir.join("adbwatch.log"))
}
