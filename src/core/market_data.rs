//! Market data types
//!
//! MarketUpdate is the transient tick record handed from the tick source to
//! the store writer. Quote is a consistent per-asset read of the store.

/// Single tick for one asset
///
/// Produced by the tick source, consumed once by the store writer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketUpdate {
    /// Column index in the universe store
    pub asset_id: u32,
    /// Last trade price
    pub price: f32,
    /// Last trade volume
    pub volume: f32,
    /// Best bid
    pub bid: f32,
    /// Best ask
    pub ask: f32,
}

impl MarketUpdate {
    /// Create new market update
    #[inline(always)]
    pub const fn new(asset_id: u32, price: f32, volume: f32, bid: f32, ask: f32) -> Self {
        Self {
            asset_id,
            price,
            volume,
            bid,
            ask,
        }
    }

    /// Quote spread (ask - bid)
    #[inline]
    pub fn spread(&self) -> f32 {
        self.ask - self.bid
    }

    /// Mid price (average of bid and ask)
    #[inline]
    pub fn mid_price(&self) -> f32 {
        (self.bid + self.ask) * 0.5
    }

    /// Notional value (price * volume)
    #[inline]
    pub fn notional(&self) -> f32 {
        self.price * self.volume
    }
}

/// All four stored fields of one asset, read under one seqlock section
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quote {
    pub price: f32,
    pub volume: f32,
    pub bid: f32,
    pub ask: f32,
}

impl Quote {
    /// Rebuild the tick that would produce this quote
    #[inline]
    pub fn to_update(self, asset_id: u32) -> MarketUpdate {
        MarketUpdate::new(asset_id, self.price, self.volume, self.bid, self.ask)
    }
}
