//! Cross-sectional statistics engine
//!
//! Every public statistic first takes a private snapshot of the store's
//! price and volume columns under the seqlock read protocol, then runs the
//! width-8 kernels over that snapshot. Statistics that belong together
//! (mean and std-dev, z-scores) always come from one snapshot.

use super::signals::SignalPipeline;
use super::simd;
use crate::core::{Column, SectorIndex, UniverseStore};
use crate::infrastructure::metrics::MetricsCollector;
use std::sync::Arc;

/// Mean and population standard deviation of one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrossSectionStats {
    pub mean: f32,
    pub std_dev: f32,
}

/// Consistent view of the price/volume columns at one instant
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot<'a> {
    pub prices: &'a [f32],
    pub volumes: &'a [f32],
}

impl MarketSnapshot<'_> {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Mean and population std-dev of `prices`
#[inline]
pub fn cross_section_stats(prices: &[f32]) -> CrossSectionStats {
    let mean = simd::mean(prices);
    let std_dev = simd::std_dev(prices, mean);
    CrossSectionStats { mean, std_dev }
}

/// Z-scores computed independently inside each sector's range
///
/// `sorted_prices` must already be in sector-sorted order for `index`;
/// results are written to `out` in that same order. No permutation happens
/// here. Sectors with zero std-dev (including single-asset sectors) get
/// all-zero scores.
pub fn sector_neutral_zscores(sorted_prices: &[f32], index: &SectorIndex, out: &mut [f32]) {
    debug_assert!(sorted_prices.len() >= index.num_assets());
    debug_assert!(out.len() >= index.num_assets());

    for (_, range) in index.ranges() {
        let prices = &sorted_prices[range.clone()];
        let stats = cross_section_stats(prices);
        simd::zscore(prices, stats.mean, stats.std_dev, &mut out[range]);
    }
}

/// Statistics reader over a shared universe store
///
/// One engine per reader thread: the snapshot buffers are private and
/// overwritten on every call.
pub struct StatsEngine {
    store: Arc<UniverseStore>,
    prices: Vec<f32>,
    volumes: Vec<f32>,
    /// Sector-ordered scratch for `sector_zscores`
    sorted_prices: Vec<f32>,
    sorted_scores: Vec<f32>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl StatsEngine {
    /// Create engine reading from `store`
    pub fn new(store: Arc<UniverseStore>) -> Self {
        Self {
            store,
            prices: Vec::new(),
            volumes: Vec::new(),
            sorted_prices: Vec::new(),
            sorted_scores: Vec::new(),
            metrics: None,
        }
    }

    /// Report snapshot counts and retries to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<UniverseStore> {
        &self.store
    }

    /// Take a consistent copy of prices and volumes
    ///
    /// Retries the whole copy until no write overlapped it.
    pub fn snapshot(&mut self) -> MarketSnapshot<'_> {
        let capacity = self.store.capacity();
        if self.prices.len() < capacity {
            self.prices.resize(capacity, 0.0);
            self.volumes.resize(capacity, 0.0);
        }

        let Self {
            store,
            prices,
            volumes,
            metrics,
            ..
        } = self;

        let ((), retries) = store.read_counted(|view| {
            view.copy_into(Column::Price, &mut prices[..capacity]);
            view.copy_into(Column::Volume, &mut volumes[..capacity]);
        });

        if let Some(metrics) = metrics {
            metrics.record_snapshot(retries);
        }

        MarketSnapshot {
            prices: &prices[..capacity],
            volumes: &volumes[..capacity],
        }
    }

    /// The most recent snapshot, without refreshing it
    pub fn last_snapshot(&self) -> MarketSnapshot<'_> {
        let n = self.store.capacity().min(self.prices.len());
        MarketSnapshot {
            prices: &self.prices[..n],
            volumes: &self.volumes[..n],
        }
    }

    /// Sum of price * volume across all assets
    pub fn total_notional(&mut self) -> f32 {
        let snap = self.snapshot();
        simd::dot(snap.prices, snap.volumes)
    }

    /// One-lane reference for `total_notional`
    pub fn total_notional_scalar(&mut self) -> f32 {
        let snap = self.snapshot();
        simd::scalar::dot(snap.prices, snap.volumes)
    }

    /// Mean price
    pub fn mean(&mut self) -> f32 {
        let snap = self.snapshot();
        simd::mean(snap.prices)
    }

    /// Population std-dev of prices around a caller-supplied mean
    ///
    /// Takes its own snapshot; use `stats()` when mean and std-dev must
    /// describe the same state.
    pub fn std_dev(&mut self, mean: f32) -> f32 {
        let snap = self.snapshot();
        simd::std_dev(snap.prices, mean)
    }

    /// Mean and std-dev from one snapshot
    pub fn stats(&mut self) -> CrossSectionStats {
        let snap = self.snapshot();
        cross_section_stats(snap.prices)
    }

    /// Global price z-scores into `out`
    ///
    /// All-zero when the std-dev is exactly zero. Writes
    /// `min(capacity, out.len())` values and leaves the rest of `out`
    /// untouched.
    pub fn zscores(&mut self, out: &mut [f32]) -> CrossSectionStats {
        let snap = self.snapshot();
        let stats = cross_section_stats(snap.prices);
        simd::zscore(snap.prices, stats.mean, stats.std_dev, out);
        stats
    }

    /// Per-asset notional (price * volume) into `out`, same length rule as
    /// `zscores`
    pub fn momentum(&mut self, out: &mut [f32]) {
        let snap = self.snapshot();
        simd::mul(snap.prices, snap.volumes, out);
    }

    /// Sector-neutral z-scores in asset order
    ///
    /// Snapshots, sorts prices into sector order with `index`, runs
    /// `sector_neutral_zscores`, then un-sorts into `out`. Same length rule
    /// as `zscores`. An `index` that does not cover exactly the store's
    /// assets yields zeros.
    pub fn sector_zscores(&mut self, index: &SectorIndex, out: &mut [f32]) {
        let n = index.num_assets();
        if self.sorted_prices.len() < n {
            self.sorted_prices.resize(n, 0.0);
            self.sorted_scores.resize(n, 0.0);
        }

        self.snapshot();
        if n != self.prices.len() {
            let len = out.len().min(self.prices.len());
            out[..len].fill(0.0);
            return;
        }
        index.sort_to_sector_order(&self.prices, &mut self.sorted_prices);
        sector_neutral_zscores(&self.sorted_prices, index, &mut self.sorted_scores);
        index.unsort_from_sector_order(&self.sorted_scores, out);
    }

    /// Run every signal of `pipeline` over one snapshot
    ///
    /// `outputs[i]` receives the i-th signal's values.
    pub fn run_pipeline(&mut self, pipeline: &mut SignalPipeline, outputs: &mut [&mut [f32]]) {
        let snap = self.snapshot();
        pipeline.execute(&snap, outputs);
    }
}
