use crate::domain::{MarketEvent, MarketId, UserId};
use async_trait::async_trait;

/// Publisher for market events
///
/// Delivery is fire-and-forget: publishing never waits on a subscriber and
/// never reports failure back to the trade or candle path.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish to connections subscribed to a market
    async fn publish_to_market(&self, market_id: MarketId, event: MarketEvent);

    /// Publish to connections subscribed to a user
    async fn publish_to_user(&self, user_id: UserId, event: MarketEvent);

    /// Get the number of active subscribers
    fn subscriber_count(&self) -> usize;
}
