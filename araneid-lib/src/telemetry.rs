use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{AraneidError, Result};

const LOG_FILE_NAME: &str = "araneid.log";

/// Initializes the global tracing subscriber, writing to both stderr and a
/// rotating file under `config.directory`.
///
/// Rotation happens on startup rather than by size or day: if a previous
/// run's `araneid.log` is still there, it gets renamed to
/// `araneid_<unix-seconds>.log` before the new run starts writing, so two
/// consecutive runs never interleave their lines in the same file.
pub fn init(config: &LoggingConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&config.directory).map_err(AraneidError::Io)?;
    rotate_existing_log(&config.directory)?;

    let file_appender = tracing_appender::rolling::never(&config.directory, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(config.level.as_str())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}

fn rotate_existing_log(directory: &str) -> Result<()> {
    let path = Path::new(directory).join(LOG_FILE_NAME);
    if !path.exists() {
        return Ok(());
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let rotated = Path::new(directory).join(format!("araneid_{timestamp}.log"));
    std::fs::rename(&path, &rotated).map_err(AraneidError::Io)
}
