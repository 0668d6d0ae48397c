use crate::application::ports::EventPublisher;
use crate::domain::{MarketEvent, MarketId, UserId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Broadcast-based event publisher
///
/// Uses tokio broadcast channels to fan events out to subscribers. Market
/// events go to per-market channels and balance updates to per-user
/// channels, so a connection only sees the balances it asked for.
/// Publishing never blocks: a receiver that falls behind by more than the
/// channel capacity observes `Lagged` and is expected to drop out.
pub struct BroadcastEventPublisher {
    /// Per-market broadcast channels
    market_channels: Arc<DashMap<MarketId, broadcast::Sender<MarketEvent>>>,
    /// Per-user broadcast channels
    user_channels: Arc<DashMap<UserId, broadcast::Sender<MarketEvent>>>,
    /// Subscriber count
    subscriber_count: Arc<AtomicUsize>,
    /// Channel capacity
    capacity: usize,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        BroadcastEventPublisher {
            market_channels: Arc::new(DashMap::new()),
            user_channels: Arc::new(DashMap::new()),
            subscriber_count: Arc::new(AtomicUsize::new(0)),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events for a specific market
    pub fn subscribe_market(&self, market_id: MarketId) -> broadcast::Receiver<MarketEvent> {
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        self.market_channels
            .entry(market_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to balance updates for a specific user
    pub fn subscribe_user(&self, user_id: UserId) -> broadcast::Receiver<MarketEvent> {
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        self.user_channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Release a market subscription whose receiver has been dropped.
    /// The channel goes away with its last receiver.
    pub fn unsubscribe_market(&self, market_id: MarketId) {
        self.market_channels
            .remove_if(&market_id, |_, tx| tx.receiver_count() == 0);
        self.release();
    }

    /// Release a user subscription whose receiver has been dropped
    pub fn unsubscribe_user(&self, user_id: UserId) {
        self.user_channels
            .remove_if(&user_id, |_, tx| tx.receiver_count() == 0);
        self.release();
    }

    fn release(&self) {
        let _ = self
            .subscriber_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Markets with at least one live channel
    pub fn market_channel_count(&self) -> usize {
        self.market_channels.len()
    }

    /// Users with at least one live channel
    pub fn user_channel_count(&self) -> usize {
        self.user_channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Clone for BroadcastEventPublisher {
    fn clone(&self) -> Self {
        BroadcastEventPublisher {
            market_channels: Arc::clone(&self.market_channels),
            user_channels: Arc::clone(&self.user_channels),
            subscriber_count: Arc::clone(&self.subscriber_count),
            capacity: self.capacity,
        }
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish_to_market(&self, market_id: MarketId, event: MarketEvent) {
        if let Some(tx) = self.market_channels.get(&market_id) {
            // Ignore send errors (no subscribers)
            let _ = tx.send(event);
        }
    }

    async fn publish_to_user(&self, user_id: UserId, event: MarketEvent) {
        if let Some(tx) = self.user_channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }

    fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}
