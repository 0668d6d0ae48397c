//! OHLC folding for price snapshots and finer candles.
//!
//! Everything here is pure: callers hand in already-fetched members and get
//! back bucket-keyed bars. Persistence and idempotence live with the caller.

use crate::value_objects::Timeframe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open/high/low/close of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    /// A bar where all four prices are equal
    pub fn flat(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Extend the bar with a later price
    #[inline]
    pub fn push(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    /// Fold prices given in chronological order. `None` for an empty window.
    pub fn from_prices<I>(prices: I) -> Option<Ohlc>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut prices = prices.into_iter();
        let mut bar = Ohlc::flat(prices.next()?);
        for price in prices {
            bar.push(price);
        }
        Some(bar)
    }

    /// Merge finer bars given in chronological order: first open, last
    /// close, extrema of highs and lows.
    pub fn merge<I>(bars: I) -> Option<Ohlc>
    where
        I: IntoIterator<Item = Ohlc>,
    {
        let mut bars = bars.into_iter();
        let mut merged = bars.next()?;
        for bar in bars {
            merged.high = merged.high.max(bar.high);
            merged.low = merged.low.min(bar.low);
            merged.close = bar.close;
        }
        Some(merged)
    }
}

/// Group members into `timeframe` buckets keyed by bucket start.
///
/// Members inside each bucket are sorted by `timestamp_of` ascending, so
/// out-of-order input still yields the correct open and close.
pub fn group_by_bucket<T, F>(
    members: impl IntoIterator<Item = T>,
    timeframe: Timeframe,
    timestamp_of: F,
) -> BTreeMap<i64, Vec<T>>
where
    F: Fn(&T) -> i64,
{
    let mut buckets: BTreeMap<i64, Vec<T>> = BTreeMap::new();
    for member in members {
        let bucket = timeframe.bucket_start(timestamp_of(&member));
        buckets.entry(bucket).or_default().push(member);
    }
    for group in buckets.values_mut() {
        group.sort_by_key(|m| timestamp_of(m));
    }
    buckets
}
