//! Events fanned out to live subscribers.
//!
//! Serialized with a `type` tag and camelCase fields. All timestamps are
//! integer Unix seconds on the wire.

use crate::domain::entities::{Candle, Market};
use crate::domain::{MarketId, MarketStatus, Prices, Timeframe, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Share state and prices changed
    MarketUpdate(MarketUpdateEvent),
    /// A candle bucket was written
    CandleUpdate(CandleUpdateEvent),
    /// A user's balance changed
    BalanceUpdate(BalanceUpdateEvent),
}

impl MarketEvent {
    pub fn market_id(&self) -> Option<MarketId> {
        match self {
            MarketEvent::MarketUpdate(e) => Some(e.market_id),
            MarketEvent::CandleUpdate(e) => Some(e.market_id),
            MarketEvent::BalanceUpdate(_) => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            MarketEvent::BalanceUpdate(e) => Some(e.user_id),
            _ => None,
        }
    }
}

/// Single point appended to a client-side price chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub yes: f64,
    pub no: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketUpdateEvent {
    pub market_id: MarketId,
    pub status: MarketStatus,
    pub yes_shares: u64,
    pub no_shares: u64,
    pub price_yes: f64,
    pub price_no: f64,
    pub history_point: HistoryPoint,
    pub timestamp: i64,
}

impl MarketUpdateEvent {
    pub fn new(market: &Market, prices: Prices, at: Timestamp) -> Self {
        MarketUpdateEvent {
            market_id: market.id,
            status: market.status,
            yes_shares: market.yes_shares,
            no_shares: market.no_shares,
            price_yes: prices.yes,
            price_no: prices.no,
            history_point: HistoryPoint {
                yes: prices.yes,
                no: prices.no,
            },
            timestamp: at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleUpdateEvent {
    pub market_id: MarketId,
    pub timeframe: Timeframe,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Bucket start
    pub timestamp: i64,
}

impl From<&Candle> for CandleUpdateEvent {
    fn from(candle: &Candle) -> Self {
        CandleUpdateEvent {
            market_id: candle.market_id,
            timeframe: candle.timeframe,
            open: candle.ohlc.open,
            high: candle.ohlc.high,
            low: candle.ohlc.low,
            close: candle.ohlc.close,
            timestamp: candle.bucket_start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateEvent {
    pub user_id: UserId,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}
