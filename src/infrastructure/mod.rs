//! Infrastructure - cold path only
//!
//! This module contains non-latency-critical code:
//! - Logging and metrics
//! - Configuration management
//! - Read-only telemetry API

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

pub use api::{start_server, AppState};
pub use config::Config;
pub use metrics::{MetricsCollector, MetricsSnapshot};
