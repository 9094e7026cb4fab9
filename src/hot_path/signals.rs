//! Pluggable cross-sectional signals
//!
//! A signal maps one market snapshot to one value per asset. Signals are
//! composed at runtime into a `SignalPipeline` and all run over the same
//! snapshot, so their outputs are mutually consistent.

use super::simd;
use super::stats_engine::{cross_section_stats, sector_neutral_zscores, MarketSnapshot};
use crate::core::SectorIndex;
use std::sync::Arc;

/// Per-asset signal over a snapshot
pub trait Signal: Send {
    /// Short identifier used in logs and summaries
    fn name(&self) -> &'static str;

    /// Write one value per asset into `output` (at least `snapshot.len()` long)
    fn calculate(&mut self, snapshot: &MarketSnapshot<'_>, output: &mut [f32]);
}

/// Global price z-score
#[derive(Debug, Default, Clone, Copy)]
pub struct ZScoreSignal;

impl Signal for ZScoreSignal {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn calculate(&mut self, snapshot: &MarketSnapshot<'_>, output: &mut [f32]) {
        let stats = cross_section_stats(snapshot.prices);
        simd::zscore(snapshot.prices, stats.mean, stats.std_dev, output);
    }
}

/// Price * volume per asset
#[derive(Debug, Default, Clone, Copy)]
pub struct MomentumSignal;

impl Signal for MomentumSignal {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn calculate(&mut self, snapshot: &MarketSnapshot<'_>, output: &mut [f32]) {
        simd::mul(snapshot.prices, snapshot.volumes, output);
    }
}

/// Price z-score within each asset's sector, in asset order
pub struct SectorNeutralSignal {
    index: Arc<SectorIndex>,
    sorted_prices: Vec<f32>,
    sorted_scores: Vec<f32>,
}

impl SectorNeutralSignal {
    pub fn new(index: Arc<SectorIndex>) -> Self {
        let n = index.num_assets();
        Self {
            index,
            sorted_prices: vec![0.0; n],
            sorted_scores: vec![0.0; n],
        }
    }
}

impl Signal for SectorNeutralSignal {
    fn name(&self) -> &'static str {
        "sector_neutral"
    }

    /// Zero-fills `output` when the index and snapshot disagree on the
    /// number of assets, so a mismatched universe never reports stale scores
    fn calculate(&mut self, snapshot: &MarketSnapshot<'_>, output: &mut [f32]) {
        if self.index.num_assets() != snapshot.len() {
            let len = output.len().min(snapshot.len());
            output[..len].fill(0.0);
            return;
        }
        self.index
            .sort_to_sector_order(snapshot.prices, &mut self.sorted_prices);
        sector_neutral_zscores(&self.sorted_prices, &self.index, &mut self.sorted_scores);
        self.index
            .unsort_from_sector_order(&self.sorted_scores, output);
    }
}

/// Ordered list of signals run over one snapshot
#[derive(Default)]
pub struct SignalPipeline {
    signals: Vec<Box<dyn Signal>>,
}

impl SignalPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signal (builder style)
    pub fn with(mut self, signal: impl Signal + 'static) -> Self {
        self.signals.push(Box::new(signal));
        self
    }

    pub fn push(&mut self, signal: Box<dyn Signal>) {
        self.signals.push(signal);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.signals.iter().map(|s| s.name())
    }

    /// Run each signal in order; `outputs[i]` receives signal `i`
    ///
    /// Signals without a matching output buffer are skipped.
    pub fn execute(&mut self, snapshot: &MarketSnapshot<'_>, outputs: &mut [&mut [f32]]) {
        for (signal, output) in self.signals.iter_mut().zip(outputs.iter_mut()) {
            signal.calculate(snapshot, output);
        }
    }
}

impl std::fmt::Debug for SignalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
