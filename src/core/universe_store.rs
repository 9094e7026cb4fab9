//! Columnar (structure-of-arrays) universe store
//!
//! Four fixed-length columns indexed by asset id, guarded by one SeqLock.
//! The whole public contract is two patterns:
//! - `write(|w| ...)` / `apply(..)`: mutate under the write section
//! - `read(|view| ...)`: read under the snapshot-with-retry protocol
//!
//! Cells are `AtomicU32` holding f32 bits and are accessed with relaxed
//! ordering, so a reader racing the writer observes stale or fresh values
//! (never undefined behaviour) and the seqlock decides whether to keep them.

use super::market_data::{MarketUpdate, Quote};
use super::seqlock::SeqLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// One f32 column
type ColumnCells = Box<[AtomicU32]>;

/// Stored field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Price,
    Volume,
    Bid,
    Ask,
}

/// Capacity-fixed columnar store for the asset universe
///
/// Allocated once, never resized. Mutated by exactly one writer thread at
/// a time; read concurrently by any number of readers.
pub struct UniverseStore {
    capacity: usize,
    prices: ColumnCells,
    volumes: ColumnCells,
    bids: ColumnCells,
    asks: ColumnCells,
    seqlock: SeqLock,
}

impl UniverseStore {
    /// Create zero-filled store for `capacity` assets
    ///
    /// A zero-capacity store is valid: every statistic over it is zero.
    pub fn new(capacity: usize) -> Self {
        tracing::debug!(capacity, "Allocating universe store");
        Self {
            capacity,
            prices: zeroed_column(capacity),
            volumes: zeroed_column(capacity),
            bids: zeroed_column(capacity),
            asks: zeroed_column(capacity),
            seqlock: SeqLock::new(),
        }
    }

    /// Number of asset slots
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Guarding seqlock (read-only diagnostics)
    #[inline]
    pub fn seqlock(&self) -> &SeqLock {
        &self.seqlock
    }

    /// Run `f` inside one write section
    ///
    /// Every mutation made through the writer becomes visible to readers
    /// atomically when `f` returns. Single writer only.
    #[inline]
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreWriter<'_>) -> R) -> R {
        let _section = self.seqlock.write();
        let mut writer = StoreWriter { store: self };
        f(&mut writer)
    }

    /// Apply one tick in its own write section
    ///
    /// Out-of-range asset ids are silently dropped.
    #[inline]
    pub fn apply(&self, update: &MarketUpdate) {
        self.write(|w| w.apply(update));
    }

    /// Run `f` until it completes without a concurrent write
    ///
    /// `f` may run several times; only the result of a clean pass is
    /// returned. Values read on a retried pass must not escape `f` by any
    /// other route.
    #[inline]
    pub fn read<R>(&self, f: impl FnMut(&ColumnView<'_>) -> R) -> R {
        self.read_counted(f).0
    }

    /// Like `read`, also returning how many passes were retried
    #[inline]
    pub fn read_counted<R>(&self, mut f: impl FnMut(&ColumnView<'_>) -> R) -> (R, u64) {
        let view = ColumnView { store: self };
        let mut retries = 0u64;
        loop {
            let token = self.seqlock.read_begin();
            let result = f(&view);
            if !self.seqlock.read_retry(token) {
                return (result, retries);
            }
            retries += 1;
        }
    }

    /// Consistent read of one asset's four fields
    pub fn quote(&self, asset_id: u32) -> Option<Quote> {
        let index = asset_id as usize;
        if index >= self.capacity {
            return None;
        }
        Some(self.read(|view| view.quote(index)))
    }

    /// Consistent copy of one column into `out`
    ///
    /// Copies `min(out.len(), capacity)` values and returns that count.
    pub fn copy_column(&self, column: Column, out: &mut [f32]) -> usize {
        self.read(|view| view.copy_into(column, out))
    }

    /// Consistent copy of the price column
    pub fn copy_prices(&self, out: &mut [f32]) -> usize {
        self.copy_column(Column::Price, out)
    }

    /// Consistent copy of the volume column
    pub fn copy_volumes(&self, out: &mut [f32]) -> usize {
        self.copy_column(Column::Volume, out)
    }

    /// Consistent copy of the bid column
    pub fn copy_bids(&self, out: &mut [f32]) -> usize {
        self.copy_column(Column::Bid, out)
    }

    /// Consistent copy of the ask column
    pub fn copy_asks(&self, out: &mut [f32]) -> usize {
        self.copy_column(Column::Ask, out)
    }

    #[inline(always)]
    fn cells(&self, column: Column) -> &[AtomicU32] {
        match column {
            Column::Price => &self.prices,
            Column::Volume => &self.volumes,
            Column::Bid => &self.bids,
            Column::Ask => &self.asks,
        }
    }
}

impl std::fmt::Debug for UniverseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniverseStore")
            .field("capacity", &self.capacity)
            .field("sequence", &self.seqlock.sequence())
            .finish()
    }
}

fn zeroed_column(capacity: usize) -> ColumnCells {
    (0..capacity).map(|_| AtomicU32::new(0)).collect()
}

#[inline(always)]
fn load(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

#[inline(always)]
fn store(cell: &AtomicU32, value: f32) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

/// Mutation handle, only reachable inside `UniverseStore::write`
pub struct StoreWriter<'a> {
    store: &'a UniverseStore,
}

impl StoreWriter<'_> {
    /// Scatter one tick into the four columns
    ///
    /// Out-of-range asset ids are dropped without signalling.
    #[inline(always)]
    pub fn apply(&mut self, update: &MarketUpdate) {
        let index = update.asset_id as usize;
        if index >= self.store.capacity {
            return;
        }
        store(&self.store.prices[index], update.price);
        store(&self.store.volumes[index], update.volume);
        store(&self.store.bids[index], update.bid);
        store(&self.store.asks[index], update.ask);
    }

    /// Apply a batch of ticks in order
    #[inline]
    pub fn apply_all(&mut self, updates: &[MarketUpdate]) {
        for update in updates {
            self.apply(update);
        }
    }

    /// Store capacity
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.store.capacity
    }
}

/// Read handle, only reachable inside `UniverseStore::read`
///
/// Values read here may be torn until the enclosing read pass validates.
pub struct ColumnView<'a> {
    store: &'a UniverseStore,
}

impl ColumnView<'_> {
    /// Number of asset slots
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.store.capacity
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.store.capacity == 0
    }

    /// Single cell; panics if `index >= len()`
    #[inline(always)]
    pub fn get(&self, column: Column, index: usize) -> f32 {
        load(&self.store.cells(column)[index])
    }

    #[inline(always)]
    pub fn price(&self, index: usize) -> f32 {
        self.get(Column::Price, index)
    }

    #[inline(always)]
    pub fn volume(&self, index: usize) -> f32 {
        self.get(Column::Volume, index)
    }

    /// All four fields of one asset; panics if `index >= len()`
    #[inline]
    pub fn quote(&self, index: usize) -> Quote {
        Quote {
            price: self.get(Column::Price, index),
            volume: self.get(Column::Volume, index),
            bid: self.get(Column::Bid, index),
            ask: self.get(Column::Ask, index),
        }
    }

    /// Copy `min(out.len(), len())` values of `column` into `out`
    #[inline]
    pub fn copy_into(&self, column: Column, out: &mut [f32]) -> usize {
        let cells = self.store.cells(column);
        let n = out.len().min(cells.len());
        for (dst, cell) in out[..n].iter_mut().zip(&cells[..n]) {
            *dst = load(cell);
        }
        n
    }
}
