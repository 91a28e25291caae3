//! Logging
//!
//! Structured logging for hosts embedding the spell search core: a JSON
//! file layer with daily rotation and a compact stdout layer, both behind
//! an `EnvFilter`. `log` macros are forwarded into `tracing`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::config::AppConfig;

/// Base name of the rolling log file.
pub const LOG_FILE_NAME: &str = "spellbook.log";

/// Build the filter: `RUST_LOG` wins, then the configured default.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(default_directive).unwrap_or_else(|e| {
            eprintln!("Invalid log level '{}': {}", default_directive, e);
            EnvFilter::new("info")
        })
    })
}

/// Initialize logging from the application configuration.
///
/// Returns a `WorkerGuard` when file logging is enabled; keep it alive for
/// the lifetime of the process so buffered lines are flushed on shutdown.
pub fn init(config: &AppConfig) -> Option<WorkerGuard> {
    let file_dir = config.logging.file.then(|| config.log_dir());
    init_with(&config.logging.level, file_dir.as_deref())
}

/// Initialize logging with an explicit level and optional log directory.
pub fn init_with(level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .compact()
        .with_target(false)
        .with_filter(env_filter(level));

    let (file_layer, guard) = match log_dir.and_then(prepare_log_dir) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // JSON for easy ingestion
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true)
                .with_filter(env_filter(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
        return guard;
    }

    // Redirect standard `log` macros to `tracing`
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize LogTracer: {}", e);
    }

    match log_dir {
        Some(dir) if guard.is_some() => log::info!(
            "Logging initialized. Writing to: {:?} (daily rolling)",
            dir.join(LOG_FILE_NAME)
        ),
        _ => log::info!("Logging initialized (stdout only)"),
    }

    guard
}

fn prepare_log_dir(dir: &Path) -> Option<PathBuf> {
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Failed to create logs directory: {}", e);
            return None;
        }
    }
    Some(dir.to_path_buf())
}
