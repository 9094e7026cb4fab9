//! Shared test fixtures
//!
//! Float comparison helpers and small pre-filled stores.

use crate::core::{MarketUpdate, UniverseStore};
use std::sync::Arc;

/// Assert `actual` is within a relative tolerance of `expected`
///
/// The tolerance is scaled by `max(1, |expected|)` so values near zero are
/// compared absolutely.
#[track_caller]
pub fn assert_close(actual: f32, expected: f32, tol: f32) {
    let bound = tol * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= bound,
        "expected {} within {} of {}",
        actual,
        bound,
        expected
    );
}

/// `len` values starting at `start`, each `step` apart
pub fn ramp(len: usize, start: f32, step: f32) -> Vec<f32> {
    (0..len).map(|i| start + i as f32 * step).collect()
}

/// Store sized to `prices` with one tick per asset
///
/// Every asset gets the same `volume`; bid/ask straddle the price by 0.01.
pub fn store_with_prices(prices: &[f32], volume: f32) -> Arc<UniverseStore> {
    let store = UniverseStore::new(prices.len());
    store.write(|w| {
        for (id, &price) in prices.iter().enumerate() {
            w.apply(&MarketUpdate::new(id as u32, price, volume, price - 0.01, price + 0.01));
        }
    });
    Arc::new(store)
}
