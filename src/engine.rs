//! Core Application Engine
//!
//! Wires the universe store, the ingestion feed and a stats engine into a
//! fixed-rate live loop: every interval it takes one snapshot, runs the
//! signal pipeline over it and classifies the global z-scores. Cycle
//! latency goes into an HDR histogram and a summary is logged at the end.

use crate::core::{SectorIndex, UniverseStore};
use crate::hot_path::{SectorNeutralSignal, SignalPipeline, StatsEngine, ZScoreSignal};
use crate::infrastructure::config::Config;
use crate::infrastructure::metrics::MetricsCollector;
use crate::ingestion::{MarketFeed, SyntheticTickSource};
use crate::{log_main, log_stats, Result, XsError};
use hdrhistogram::Histogram;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;

/// |z| beyond which an asset gets a directional call
pub const SIGNAL_THRESHOLD: f32 = 1.0;

/// Buy/sell/hold tally over a set of z-scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalCounts {
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
}

impl SignalCounts {
    pub fn total(&self) -> u64 {
        self.buys + self.sells + self.holds
    }

    fn add(&mut self, other: SignalCounts) {
        self.buys += other.buys;
        self.sells += other.sells;
        self.holds += other.holds;
    }
}

/// Mean-reversion call per asset: cheap (z < -threshold) is a buy, rich
/// (z > threshold) a sell, anything else a hold
pub fn classify(zscores: &[f32], threshold: f32) -> SignalCounts {
    let mut counts = SignalCounts::default();
    for &z in zscores {
        if z < -threshold {
            counts.buys += 1;
        } else if z > threshold {
            counts.sells += 1;
        } else {
            counts.holds += 1;
        }
    }
    counts
}

/// Cycle latency percentiles in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub mean_us: f64,
    pub std_dev_us: f64,
    pub min_us: f64,
    pub p50_us: f64,
    pub p99_us: f64,
    pub p999_us: f64,
    pub max_us: f64,
}

impl LatencySummary {
    fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }
        let us = |nanos: u64| nanos as f64 / 1_000.0;
        Self {
            mean_us: histogram.mean() / 1_000.0,
            std_dev_us: histogram.stdev() / 1_000.0,
            min_us: us(histogram.min()),
            p50_us: us(histogram.value_at_quantile(0.50)),
            p99_us: us(histogram.value_at_quantile(0.99)),
            p999_us: us(histogram.value_at_quantile(0.999)),
            max_us: us(histogram.max()),
        }
    }
}

/// Outcome of one live run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cycles: u64,
    pub signals: SignalCounts,
    pub latency: LatencySummary,
    pub updates_processed: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Store updates per second over the run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.updates_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Main engine owning the shared universe
pub struct AppEngine {
    config: Config,
    store: Arc<UniverseStore>,
    sectors: Arc<SectorIndex>,
    metrics: Arc<MetricsCollector>,
}

impl AppEngine {
    /// Allocate the store and build the sector index from config
    ///
    /// # Errors
    /// Invalid config or sector layout.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let universe = &config.universe;
        let assignments = SectorIndex::random_assignments(
            universe.num_assets,
            universe.num_sectors,
            universe.sector_seed,
        );
        let sectors = SectorIndex::new(universe.num_assets, universe.num_sectors, &assignments)?;

        log_main!(
            Level::INFO,
            num_assets = universe.num_assets,
            num_sectors = universe.num_sectors,
            "Universe allocated"
        );

        Ok(Self {
            store: Arc::new(UniverseStore::new(universe.num_assets)),
            sectors: Arc::new(sectors),
            metrics: Arc::new(MetricsCollector::new()),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<UniverseStore> {
        Arc::clone(&self.store)
    }

    pub fn sectors(&self) -> Arc<SectorIndex> {
        Arc::clone(&self.sectors)
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// Run the live loop for the configured duration (blocking)
    pub fn run(&self) -> Result<RunSummary> {
        self.run_for(Duration::from_secs(self.config.signal.run_seconds))
    }

    /// Run the live loop for `duration` after warmup (blocking)
    ///
    /// The feed is stopped before returning, also on error.
    pub fn run_for(&self, duration: Duration) -> Result<RunSummary> {
        let feed_config = &self.config.feed;
        let signal_config = &self.config.signal;
        let num_assets = self.store.capacity();

        let source = SyntheticTickSource::new(num_assets, feed_config);
        let mut feed = MarketFeed::new(self.store(), feed_config.queue_capacity, source)?
            .with_metrics(self.metrics())
            .with_backpressure(feed_config.backpressure)
            .with_idle(feed_config.idle);

        let mut pipeline = SignalPipeline::new().with(ZScoreSignal);
        if signal_config.sector_neutral {
            pipeline = pipeline.with(SectorNeutralSignal::new(self.sectors()));
        }
        let mut stats = StatsEngine::new(self.store()).with_metrics(self.metrics());

        // Millisecond-scale cycles are expected; anything past a minute saturates.
        let mut latency = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)
            .map_err(|e| XsError::Telemetry(format!("latency histogram: {}", e)))?;

        let mut outputs: Vec<Vec<f32>> = vec![vec![0.0; num_assets]; pipeline.len()];
        let mut views: Vec<&mut [f32]> = outputs.iter_mut().map(Vec::as_mut_slice).collect();

        log_main!(
            Level::INFO,
            num_assets,
            signals = ?pipeline,
            interval_us = signal_config.interval_us,
            run_ms = duration.as_millis() as u64,
            "Starting live loop"
        );

        feed.start()?;
        std::thread::sleep(Duration::from_millis(signal_config.warmup_ms));

        let interval = Duration::from_micros(signal_config.interval_us);
        let start = Instant::now();
        let deadline = start + duration;
        let mut next_report = start + Duration::from_secs(1);
        let mut cycles = 0u64;
        let mut signals = SignalCounts::default();

        while Instant::now() < deadline {
            let cycle_start = Instant::now();
            stats.run_pipeline(&mut pipeline, &mut views);
            let cycle_nanos = cycle_start.elapsed().as_nanos() as u64;

            latency.saturating_record(cycle_nanos.max(1));
            signals.add(classify(&views[0][..], SIGNAL_THRESHOLD));
            self.metrics.record_signal_cycle();
            feed.sample_queue_depth();
            cycles += 1;

            if Instant::now() >= next_report {
                let snap = self.metrics.snapshot();
                log_stats!(
                    Level::INFO,
                    cycles,
                    updates = snap.updates_processed,
                    queue_depth = snap.queue_depth,
                    max_queue_depth = snap.max_queue_depth,
                    snapshot_retries = snap.snapshot_retries,
                    "Live loop progress"
                );
                next_report += Duration::from_secs(1);
            }

            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }

        feed.stop();
        let elapsed = start.elapsed();

        let summary = RunSummary {
            cycles,
            signals,
            latency: LatencySummary::from_histogram(&latency),
            updates_processed: feed.updates_processed(),
            elapsed,
        };
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &RunSummary) {
    let total = summary.signals.total().max(1) as f64;
    let pct = |n: u64| 100.0 * n as f64 / total;

    log_main!(
        Level::INFO,
        updates = summary.updates_processed,
        elapsed_s = summary.elapsed.as_secs_f64(),
        throughput_m_per_s = summary.throughput() / 1e6,
        "Feed summary"
    );
    log_main!(
        Level::INFO,
        mean_us = summary.latency.mean_us,
        std_dev_us = summary.latency.std_dev_us,
        min_us = summary.latency.min_us,
        p50_us = summary.latency.p50_us,
        p99_us = summary.latency.p99_us,
        p999_us = summary.latency.p999_us,
        max_us = summary.latency.max_us,
        "Signal computation latency"
    );
    log_main!(
        Level::INFO,
        cycles = summary.cycles,
        buy_pct = pct(summary.signals.buys),
        sell_pct = pct(summary.signals.sells),
        hold_pct = pct(summary.signals.holds),
        "Signal distribution"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.universe.num_assets = 64;
        config.universe.num_sectors = 4;
        config.feed.queue_capacity = 128;
        config.feed.seed = Some(5);
        config.signal.interval_us = 50;
        config.signal.warmup_ms = 10;
        config
    }

    #[test]
    fn test_classify_thresholds() {
        let counts = classify(&[-2.0, -1.0, 0.0, 0.5, 1.0, 1.5, f32::NAN], SIGNAL_THRESHOLD);
        assert_eq!(
            counts,
            SignalCounts {
                buys: 1,
                sells: 1,
                holds: 5
            }
        );
    }

    #[test]
    fn test_engine_rejects_bad_config() {
        let mut config = small_config();
        config.feed.queue_capacity = 0;
        assert!(matches!(AppEngine::new(config), Err(XsError::Config(_))));
    }

    #[test]
    fn test_short_run_produces_summary() {
        let engine = AppEngine::new(small_config()).unwrap();
        let summary = engine.run_for(Duration::from_millis(50)).unwrap();

        assert!(summary.cycles > 0);
        assert_eq!(summary.signals.total(), summary.cycles * 64);
        assert!(summary.updates_processed > 0);
        assert!(summary.latency.max_us >= summary.latency.min_us);

        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.signal_cycles, summary.cycles);
        assert_eq!(metrics.snapshots_taken, summary.cycles);
        assert_eq!(metrics.updates_processed, summary.updates_processed);
    }

    #[test]
    fn test_zero_asset_universe_runs() {
        let mut config = small_config();
        config.universe.num_assets = 0;
        let engine = AppEngine::new(config).unwrap();
        let summary = engine.run_for(Duration::from_millis(5)).unwrap();
        assert_eq!(summary.signals.total(), 0);
        assert_eq!(summary.updates_processed, 0);
    }
}
