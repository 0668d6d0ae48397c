use crate::domain::{MarketId, Prices, Timestamp};
use serde::{Deserialize, Serialize};

/// Price point recorded after every committed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub market_id: MarketId,
    pub price_yes: f64,
    pub price_no: f64,
    pub timestamp: Timestamp,
}

impl PriceSnapshot {
    pub fn new(market_id: MarketId, prices: Prices, timestamp: Timestamp) -> Self {
        PriceSnapshot {
            market_id,
            price_yes: prices.yes,
            price_no: prices.no,
            timestamp,
        }
    }
}
