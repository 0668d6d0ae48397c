use crate::domain::MarketId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-market async mutex table.
///
/// Trading and resolution on one market take the same lock, so the
/// read-price-commit cycle never interleaves with another writer on that
/// market. Different markets never contend.
#[derive(Debug, Clone, Default)]
pub struct MarketLocks {
    locks: Arc<DashMap<MarketId, Arc<Mutex<()>>>>,
}

impl MarketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `market_id`. Released when the guard drops.
    pub async fn lock(&self, market_id: MarketId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is not held across the await
        let mutex = self
            .locks
            .entry(market_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
