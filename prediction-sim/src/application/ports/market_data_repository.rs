//! Ports for the price snapshot stream and candle storage

use async_trait::async_trait;
use std::collections::HashSet;

use super::StoreError;
use crate::domain::{Candle, MarketId, PriceSnapshot, Timeframe, Timestamp};

/// Read operations for price snapshots
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Snapshots with `from <= timestamp < to`, oldest first
    async fn snapshots_between(
        &self,
        market_id: MarketId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PriceSnapshot>, StoreError>;

    /// Full series for a market, oldest first
    async fn history(&self, market_id: MarketId) -> Result<Vec<PriceSnapshot>, StoreError>;
}

/// Append-only snapshot writes
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    async fn append(&self, snapshot: PriceSnapshot) -> Result<(), StoreError>;
}

/// Read operations for candles
#[async_trait]
pub trait CandleReader: Send + Sync {
    async fn get_candle(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        bucket_start: i64,
    ) -> Result<Option<Candle>, StoreError>;

    /// Candles with `bucket_start >= since`, ascending
    async fn candles_since(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        since: i64,
    ) -> Result<Vec<Candle>, StoreError>;

    /// Which of `buckets` are already persisted
    async fn existing_buckets(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        buckets: &[i64],
    ) -> Result<HashSet<i64>, StoreError>;

    /// The most recent `limit` candles, ascending
    async fn latest_candles(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, StoreError>;
}

/// Write operations for candles
#[async_trait]
pub trait CandleWriter: Send + Sync {
    /// Insert or replace. Only used for base-timeframe buckets that are still
    /// open.
    async fn upsert_candle(&self, candle: Candle) -> Result<(), StoreError>;

    /// Insert unless the bucket exists. Returns whether it was written.
    async fn insert_candle_if_absent(&self, candle: Candle) -> Result<bool, StoreError>;
}

/// Combined snapshot store
pub trait SnapshotRepository: SnapshotReader + SnapshotWriter {}

impl<T: SnapshotReader + SnapshotWriter> SnapshotRepository for T {}

/// Combined candle store
pub trait CandleRepository: CandleReader + CandleWriter {}

impl<T: CandleReader + CandleWriter> CandleRepository for T {}
