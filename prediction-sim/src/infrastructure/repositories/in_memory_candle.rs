use crate::application::ports::{CandleReader, CandleWriter, StoreError};
use crate::domain::{Candle, MarketId, Timeframe};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

type SeriesKey = (MarketId, Timeframe);

/// In-memory candle store, one bucket-ordered series per market and timeframe
pub struct InMemoryCandleRepository {
    series: Arc<DashMap<SeriesKey, BTreeMap<i64, Candle>>>,
}

impl InMemoryCandleRepository {
    pub fn new() -> Self {
        Self {
            series: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryCandleRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryCandleRepository {
    fn clone(&self) -> Self {
        Self {
            series: Arc::clone(&self.series),
        }
    }
}

#[async_trait]
impl CandleReader for InMemoryCandleRepository {
    async fn get_candle(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        bucket_start: i64,
    ) -> Result<Option<Candle>, StoreError> {
        Ok(self
            .series
            .get(&(market_id, timeframe))
            .and_then(|s| s.get(&bucket_start).cloned()))
    }

    async fn candles_since(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        since: i64,
    ) -> Result<Vec<Candle>, StoreError> {
        Ok(self
            .series
            .get(&(market_id, timeframe))
            .map(|s| s.range(since..).map(|(_, c)| c.clone()).collect())
            .unwrap_or_default())
    }

    async fn existing_buckets(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        buckets: &[i64],
    ) -> Result<HashSet<i64>, StoreError> {
        let Some(series) = self.series.get(&(market_id, timeframe)) else {
            return Ok(HashSet::new());
        };
        Ok(buckets
            .iter()
            .copied()
            .filter(|b| series.contains_key(b))
            .collect())
    }

    async fn latest_candles(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, StoreError> {
        let Some(series) = self.series.get(&(market_id, timeframe)) else {
            return Ok(Vec::new());
        };
        let mut latest: Vec<Candle> = series.values().rev().take(limit).cloned().collect();
        latest.reverse();
        Ok(latest)
    }
}

#[async_trait]
impl CandleWriter for InMemoryCandleRepository {
    async fn upsert_candle(&self, candle: Candle) -> Result<(), StoreError> {
        self.series
            .entry((candle.market_id, candle.timeframe))
            .or_default()
            .insert(candle.bucket_start, candle);
        Ok(())
    }

    async fn insert_candle_if_absent(&self, candle: Candle) -> Result<bool, StoreError> {
        let mut series = self
            .series
            .entry((candle.market_id, candle.timeframe))
            .or_default();
        if series.contains_key(&candle.bucket_start) {
            return Ok(false);
        }
        series.insert(candle.bucket_start, candle);
        Ok(true)
    }
}
