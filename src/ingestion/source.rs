//! Tick sources for the ingestion pipeline

use crate::core::MarketUpdate;
use crate::infrastructure::config::FeedConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Producer-side origin of ticks
///
/// Called in a loop on the producer thread; `None` means the source is
/// exhausted and the producer exits.
pub trait TickSource: Send {
    fn next_tick(&mut self) -> Option<MarketUpdate>;
}

impl<S: TickSource + ?Sized> TickSource for Box<S> {
    #[inline]
    fn next_tick(&mut self) -> Option<MarketUpdate> {
        (**self).next_tick()
    }
}

/// Random-walk exchange simulator
///
/// Each tick picks a uniform random asset, moves its price by a uniform
/// relative shock in `[-volatility, volatility]`, draws a uniform volume
/// and quotes bid/ask at `price -/+ spread`. Never exhausts unless the
/// universe is empty.
pub struct SyntheticTickSource {
    rng: StdRng,
    prices: Vec<f32>,
    volatility: f32,
    spread: f32,
    min_volume: f32,
    max_volume: f32,
}

impl SyntheticTickSource {
    pub fn new(num_assets: usize, config: &FeedConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            prices: vec![config.initial_price; num_assets],
            volatility: config.volatility.abs(),
            spread: config.spread,
            min_volume: config.min_volume,
            max_volume: config.max_volume.max(config.min_volume),
        }
    }

    /// Current simulated price of `asset_id`
    pub fn price(&self, asset_id: u32) -> Option<f32> {
        self.prices.get(asset_id as usize).copied()
    }
}

impl TickSource for SyntheticTickSource {
    #[inline]
    fn next_tick(&mut self) -> Option<MarketUpdate> {
        if self.prices.is_empty() {
            return None;
        }

        let asset = self.rng.gen_range(0..self.prices.len());
        let shock = self.rng.gen_range(-self.volatility..=self.volatility);
        let volume = self.rng.gen_range(self.min_volume..=self.max_volume);

        let price = &mut self.prices[asset];
        *price *= 1.0 + shock;
        let price = *price;

        Some(MarketUpdate::new(
            asset as u32,
            price,
            volume,
            price - self.spread,
            price + self.spread,
        ))
    }
}

/// Finite, pre-recorded tick sequence
#[derive(Debug, Clone)]
pub struct ReplayTickSource {
    ticks: std::vec::IntoIter<MarketUpdate>,
}

impl ReplayTickSource {
    pub fn new(ticks: Vec<MarketUpdate>) -> Self {
        Self {
            ticks: ticks.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl TickSource for ReplayTickSource {
    #[inline]
    fn next_tick(&mut self) -> Option<MarketUpdate> {
        self.ticks.next()
    }
}
