//! Centralized file-based logging system
//!
//! Writes logs to files in logs/ directory, separated by log type:
//! - logs/main/  - all events as JSON
//! - logs/error/ - warnings and errors only
//! - logs/feed/  - ingestion pipeline events
//! - logs/api/   - telemetry server events
//!
//! Nothing on the per-tick path logs; targets are meant for lifecycle and
//! periodic summary events.

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_DIR: &str = "logs";
const LOG_TYPES: [&str; 4] = ["main", "error", "feed", "api"];

/// Initialize file + console logging
///
/// The returned guards flush the non-blocking writers on drop and must be
/// kept alive for the duration of the program. `RUST_LOG` overrides the
/// default `info` filter.
///
/// # Errors
/// Fails when the log directories cannot be created.
pub fn init_logging() -> crate::Result<Vec<WorkerGuard>> {
    let logs_dir = Path::new(LOG_DIR);
    for log_type in LOG_TYPES {
        fs::create_dir_all(logs_dir.join(log_type))?;
    }

    let mut guards = Vec::with_capacity(LOG_TYPES.len());

    let (main_appender, main_guard) = create_appender(logs_dir, "main");
    guards.push(main_guard);

    let (error_appender, error_guard) = create_appender(logs_dir, "error");
    guards.push(error_guard);

    let (feed_appender, feed_guard) = create_appender(logs_dir, "feed");
    guards.push(feed_guard);

    let (api_appender, api_guard) = create_appender(logs_dir, "api");
    guards.push(api_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(LevelFilter::WARN);

    let feed_layer = tracing_subscriber::fmt::layer()
        .with_writer(feed_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_filter(filter_fn(|metadata| {
            metadata.target() == "feed" || metadata.target().contains("ingestion")
        }));

    let api_layer = tracing_subscriber::fmt::layer()
        .with_writer(api_appender)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter_fn(|metadata| metadata.target().contains("api")));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(main_layer)
        .with(error_layer)
        .with(feed_layer)
        .with(api_layer)
        .with(console_layer)
        .init();

    tracing::info!("Logging system initialized. Log files in {}/ directory", LOG_DIR);

    Ok(guards)
}

/// Daily rolling, non-blocking file writer under `logs/<name>/`
fn create_appender(logs_dir: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir.join(name), name);
    tracing_appender::non_blocking(appender)
}

/// Log macro helpers for specific log types
#[macro_export]
macro_rules! log_feed {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "feed", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_stats {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "stats", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_api {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "api", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_main {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "main", $level, $($arg)+)
    };
}
