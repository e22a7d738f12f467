use std::time::Duration;

use pocket_domain::{LoggingConfig, PocketError, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the rolling-file writer flushing. Drop it only at process exit.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. With `file_dir` configured a
/// daily rolling file is written next to stdout (plain text, no ANSI).
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| PocketError::Config(format!("invalid log filter '{}': {e}", config.level)))?;

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    if config.json {
        layers.push(fmt::layer().json().boxed());
    } else {
        layers.push(fmt::layer().boxed());
    }

    let file_guard = match config.file_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| PocketError::Internal(format!("failed to install tracing subscriber: {e}")))?;

    info!(level = %config.level, json = config.json, file = config.file_dir.is_some(), "logging initialised");
    Ok(LoggingGuard { _file: file_guard })
}

/// Log the outcome of a command execution with structured fields.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&PocketError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => {
            warn!(command, duration_ms, error_type = error_label(err), "command_execution_failure")
        }
    }
}

/// Convert a `PocketError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &PocketError) -> &'static str {
    match error {
        PocketError::Database(_) => "database",
        PocketError::Config(_) => "config",
        PocketError::Security(_) => "security",
        PocketError::Auth(_) => "auth",
        PocketError::InvalidCredentials { .. } => "invalid_credentials",
        PocketError::AccountLocked(_) => "account_locked",
        PocketError::NotFound(_) => "not_found",
        PocketError::InvalidInput(_) => "invalid_input",
        PocketError::Conflict(_) => "conflict",
        PocketError::Serialization(_) => "serialization",
        PocketError::Internal(_) => "internal",
    }
}
