use crate::application::ports::{SnapshotReader, SnapshotWriter, StoreError};
use crate::domain::{MarketId, PriceSnapshot, Timestamp};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory price snapshot stream
///
/// Each market's series is kept sorted by timestamp; an append that arrives
/// late is inserted at its place in time rather than at the tail.
pub struct InMemorySnapshotRepository {
    series: Arc<DashMap<MarketId, Vec<PriceSnapshot>>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self {
            series: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self, market_id: MarketId) -> usize {
        self.series.get(&market_id).map_or(0, |s| s.len())
    }
}

impl Default for InMemorySnapshotRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemorySnapshotRepository {
    fn clone(&self) -> Self {
        Self {
            series: Arc::clone(&self.series),
        }
    }
}

#[async_trait]
impl SnapshotWriter for InMemorySnapshotRepository {
    async fn append(&self, snapshot: PriceSnapshot) -> Result<(), StoreError> {
        let mut series = self.series.entry(snapshot.market_id).or_default();
        let at = series.partition_point(|s| s.timestamp <= snapshot.timestamp);
        series.insert(at, snapshot);
        Ok(())
    }
}

#[async_trait]
impl SnapshotReader for InMemorySnapshotRepository {
    async fn snapshots_between(
        &self,
        market_id: MarketId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PriceSnapshot>, StoreError> {
        let Some(series) = self.series.get(&market_id) else {
            return Ok(Vec::new());
        };
        let start = series.partition_point(|s| s.timestamp < from);
        let end = series.partition_point(|s| s.timestamp < to);
        Ok(series[start..end.max(start)].to_vec())
    }

    async fn history(&self, market_id: MarketId) -> Result<Vec<PriceSnapshot>, StoreError> {
        Ok(self
            .series
            .get(&market_id)
            .map(|s| s.value().clone())
            .unwrap_or_default())
    }
}
