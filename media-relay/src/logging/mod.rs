//! Logging initialization.
//!
//! Console output always; an optional daily-rotated file appender when a log
//! directory is configured. The returned guard must be kept alive for the
//! process lifetime or buffered file output is lost.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "media_relay=info,upstream_client=info,tower_http=info";

/// Initialize the tracing subscriber.
///
/// Returns the file appender guard when file logging is enabled.
pub fn init_logging(log_dir: Option<&str>) -> crate::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true));

    let guard = match log_dir {
        Some(dir) => {
            let log_path = PathBuf::from(dir);
            std::fs::create_dir_all(&log_path)?;

            let file_appender = tracing_appender::rolling::daily(&log_path, "media-relay.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .try_init()
                .map_err(|e| {
                    crate::Error::Other(format!("Failed to set global default subscriber: {e}"))
                })?;
            Some(guard)
        }
        None => {
            registry.try_init().map_err(|e| {
                crate::Error::Other(format!("Failed to set global default subscriber: {e}"))
            })?;
            None
        }
    };

    Ok(guard)
}
