//! Concurrent cross-sectional market-data engine
//!
//! A single ingestion pipeline writes ticks into a seqlock-guarded columnar
//! store while any number of reader threads compute cross-sectional
//! statistics over consistent snapshots of it.

#![cfg_attr(feature = "portable-simd", feature(portable_simd))]

pub mod core;
pub mod engine;
pub mod hot_path;
pub mod infrastructure;
pub mod ingestion;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::core::{MarketUpdate, Quote, SectorIndex, SeqLock, UniverseStore};
pub use hot_path::{CrossSectionStats, SignalPipeline, StatsEngine};
pub use infrastructure::config::Config;
pub use ingestion::MarketFeed;

use thiserror::Error;

/// Main error type for the engine
///
/// Only construction and cold-path operations return errors. Hot paths
/// (push/pop/apply/statistics) never do.
#[derive(Error, Debug)]
pub enum XsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid capacity {capacity} for {component}")]
    InvalidCapacity {
        component: &'static str,
        capacity: usize,
    },

    #[error("Sector assignment error: {0}")]
    SectorAssignment(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, XsError>;
