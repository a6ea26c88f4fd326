//! Tracing subscriber setup

use crate::config::LogConfig;
use crate::error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. When a log directory is
/// configured the returned guard must be held until shutdown so buffered
/// lines are flushed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Configuration(format!("invalid log level: {}", e)))?;

    let (file_writer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "movie-catalog.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match (config.json, file_writer) {
        (true, Some(file)) => builder
            .json()
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (true, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (false, Some(file)) => builder.with_writer(std::io::stderr.and(file)).try_init(),
        (false, None) => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| Error::Configuration(format!("tracing already initialised: {}", e)))?;

    Ok(guard)
}
