//! Ingestion pipeline
//!
//! Moves ticks from a `TickSource` through the SPSC ring buffer into the
//! universe store on two dedicated threads.

pub mod feed;
pub mod source;

pub use crate::infrastructure::config::{BackpressurePolicy, IdlePolicy};
pub use feed::MarketFeed;
pub use source::{ReplayTickSource, SyntheticTickSource, TickSource};
