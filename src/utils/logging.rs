use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::utils::error::{AppError, Result};

/// Install the global subscriber: stdout plus a daily-rolled file in `data_dir`.
///
/// `RUST_LOG` takes precedence over the configured level. Keep the returned
/// guard alive for the life of the process or buffered file output is lost.
pub fn init(config: &LoggingConfig, data_dir: &Path) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&config.level)))
        .map_err(|e| AppError::Configuration(format!("Invalid log level '{}': {}", config.level, e)))?;

    let file_appender = tracing_appender::rolling::daily(data_dir, &config.file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|e| AppError::Configuration(format!("Failed to initialise logging: {}", e)))?;

    Ok(guard)
}

fn default_directive(level: &str) -> String {
    format!("warn,uatu_pricewatch={level}")
}
