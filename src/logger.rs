//! Debug logging support for safereplace
//!
//! When `[logging] debug = true` is set in the config file, tracing events from
//! discovery and apply are written to a log file. Standard output and standard
//! error are never used for logs.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

use crate::config::{self, LoggingConfig};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_FILTER_ENV: &str = "SAFEREPLACE_LOG";

const DEFAULT_FILTER: &str = "safereplace=info";

/// Initialize the debug logging system
///
/// Returns the path to the log file, or None if logging is not enabled.
pub fn init_debug_logging(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    if !config.debug {
        return Ok(None);
    }

    let log_path = get_log_path(config)?;

    // Ensure parent directory exists
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(Some(log_path))
}

/// Get the log file path
///
/// Uses `log_file` from the config when set, otherwise ~/.safereplace/safereplace.log
pub fn get_log_path(config: &LoggingConfig) -> Result<PathBuf> {
    match &config.log_file {
        Some(path) => Ok(path.clone()),
        None => Ok(config::config_dir()?.join("safereplace.log")),
    }
}
