// Tracing subscriber setup.
//
// Logs go to stderr, and additionally to a file when one is configured.
// `RUST_LOG` overrides the configured level.

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::ConfigError;

/// Parse a level name (`trace`, `debug`, `info`, `warn`, `error`),
/// ignoring case.
pub fn parse_level(level: &str) -> Result<Level, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel {
            level: level.to_owned(),
        }),
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when `log_file` is set; hold it for the
/// lifetime of the program so buffered lines are flushed. Fails if a
/// subscriber is already installed.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, ConfigError> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let log_dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let log_filename = path.file_name().ok_or_else(|| ConfigError::Validation {
                field: "log_file".into(),
                reason: format!("{} has no file name", path.display()),
            })?;
            std::fs::create_dir_all(log_dir)?;

            let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    Ok(guard)
}
