//! Console and rolling file logging.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::error::AppError;

const LOG_FILE_PREFIX: &str = "price-watch";

/// Installs the global logger: ANSI output on stdout plus a plain daily file
/// under `config.logs_path`, keeping `config.log_files` days.
///
/// `log` records are bridged into `tracing`. `RUST_LOG` wins over
/// `config.log_level`. Keep the returned guard alive until shutdown so the
/// file writer flushes.
pub fn setup_logging(config: &Config) -> Result<WorkerGuard, AppError> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.log_files.max(1))
        .build(&config.logs_path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Cannot write logs to '{}': {e}",
                config.logs_path.to_string_lossy()
            ),
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&config.log_level)))
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Invalid log level `{}`: {e}", config.log_level),
        })?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("A global logger is already installed: {e}"),
        })?;

    Ok(guard)
}

/// Scopes a bare level to this crate. Full directives pass through.
fn default_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("price_watch={level}")
    }
}
