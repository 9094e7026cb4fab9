//! Hot path operations - zero allocation, zero panic
//!
//! This module contains the latency-critical read side:
//! - Width-8 vector kernels
//! - Snapshot-based cross-sectional statistics
//! - Composable signals

pub mod signals;
pub mod simd;
pub mod stats_engine;

pub use signals::{MomentumSignal, SectorNeutralSignal, Signal, SignalPipeline, ZScoreSignal};
pub use stats_engine::{
    cross_section_stats, sector_neutral_zscores, CrossSectionStats, MarketSnapshot, StatsEngine,
};
