use std::fs;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_DIRECTIVE: &str = "pipeline_academy=info";

/// Initializes the logging system with console output and, when enabled,
/// a daily-rotated JSON log file under `log_dir`.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let file_layer = if config.file_logging {
        match fs::create_dir_all(&config.log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(&config.log_dir, "academy.log");
                let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the guard for the process lifetime so buffered lines are flushed
                let _ = FILE_GUARD.set(guard);
                Some(fmt::layer().json().with_writer(non_blocking_writer))
            }
            Err(e) => {
                eprintln!("⚠️  Could not create log directory '{}': {}", config.log_dir, e);
                None
            }
        }
    } else {
        None
    };

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();
}
