//! Core types and concurrency primitives
//!
//! - MarketUpdate / Quote: tick and per-asset read records
//! - SeqLock: single-writer optimistic consistency
//! - UniverseStore: seqlock-guarded columnar store
//! - RingBuffer: SPSC handoff from tick source to store writer
//! - SectorIndex: sector-contiguous permutation of asset ids

pub mod market_data;
pub mod ring_buffer;
pub mod sector_index;
pub mod seqlock;
pub mod universe_store;

pub use market_data::{MarketUpdate, Quote};
pub use ring_buffer::{Consumer, Producer, QueueGauge, RingBuffer};
pub use sector_index::SectorIndex;
pub use seqlock::{SeqLock, SeqLockWriteGuard};
pub use universe_store::{Column, ColumnView, StoreWriter, UniverseStore};
