use crate::domain::{MarketId, Ohlc, Timeframe};
use serde::{Deserialize, Serialize};

/// One OHLC bar of `price_yes` for a market and timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub market_id: MarketId,
    pub timeframe: Timeframe,
    /// Bucket start in Unix seconds, aligned to the timeframe width
    pub bucket_start: i64,
    #[serde(flatten)]
    pub ohlc: Ohlc,
}

impl Candle {
    pub fn new(market_id: MarketId, timeframe: Timeframe, bucket_start: i64, ohlc: Ohlc) -> Self {
        Candle {
            market_id,
            timeframe,
            bucket_start,
            ohlc,
        }
    }

    /// Exclusive end of the bucket
    pub fn bucket_end(&self) -> i64 {
        self.bucket_start + self.timeframe.seconds()
    }
}
