//! Request and response bodies for the REST API.
//!
//! Field names are camelCase, money travels as JSON numbers and every
//! timestamp is integer Unix seconds.

use crate::application::ports::Payout;
use crate::application::use_cases::{
    ErrorKind, MarketDetail, MarketSummary, PositionView, TradeOutcome, UserPortfolio,
};
use crate::domain::{
    Candle, Market, MarketId, MarketStatus, Outcome, Prices, Side, Timeframe, TradeHistoryEntry,
    TradeId, User, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Outcome and side are strings so a bad value becomes a validation error
/// instead of an extractor rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub user_id: UserId,
    pub outcome: String,
    pub side: String,
    /// Any JSON number; only positive integers pass validation
    pub shares: serde_json::Number,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveRequest {
    /// `null` or absent closes the market with no winner
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandleQuery {
    #[serde(default)]
    pub tf: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: i64,
    pub subscribers: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketResponse {
    pub id: MarketId,
    pub title: String,
    pub description: String,
    pub status: MarketStatus,
    pub yes_shares: u64,
    pub no_shares: u64,
    pub price_yes: f64,
    pub price_no: f64,
    pub resolution: Option<Outcome>,
    pub resolution_note: Option<String>,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

impl MarketResponse {
    pub fn new(market: Market, prices: Prices) -> Self {
        MarketResponse {
            id: market.id,
            title: market.title,
            description: market.description,
            status: market.status,
            yes_shares: market.yes_shares,
            no_shares: market.no_shares,
            price_yes: prices.yes,
            price_no: prices.no,
            resolution: market.resolution,
            resolution_note: market.resolution_note,
            created_at: market.created_at.timestamp(),
            resolved_at: market.resolved_at.map(|t| t.timestamp()),
        }
    }
}

impl From<MarketSummary> for MarketResponse {
    fn from(summary: MarketSummary) -> Self {
        MarketResponse::new(summary.market, summary.prices)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePointResponse {
    pub timestamp: i64,
    pub price_yes: f64,
}

#[derive(Debug, Serialize)]
pub struct MarketDetailResponse {
    #[serde(flatten)]
    pub market: MarketResponse,
    pub history: Vec<PricePointResponse>,
}

impl From<MarketDetail> for MarketDetailResponse {
    fn from(detail: MarketDetail) -> Self {
        MarketDetailResponse {
            history: detail
                .history
                .iter()
                .map(|p| PricePointResponse {
                    timestamp: p.timestamp.timestamp(),
                    price_yes: p.price_yes,
                })
                .collect(),
            market: MarketResponse::new(detail.market, detail.prices),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleResponse {
    /// Bucket start
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&Candle> for CandleResponse {
    fn from(candle: &Candle) -> Self {
        CandleResponse {
            timestamp: candle.bucket_start,
            open: candle.ohlc.open,
            high: candle.ohlc.high,
            low: candle.ohlc.low,
            close: candle.ohlc.close,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlesResponse {
    pub market_id: MarketId,
    pub timeframe: Timeframe,
    pub candles: Vec<CandleResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub trade_id: TradeId,
    /// Amount moved on the balance
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub exact_cost: f64,
    pub price: f64,
    pub price_yes: f64,
    pub price_no: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub yes_shares: u64,
    pub no_shares: u64,
}

impl From<TradeOutcome> for TradeResponse {
    fn from(outcome: TradeOutcome) -> Self {
        TradeResponse {
            trade_id: outcome.trade_id,
            cost: outcome.cost,
            exact_cost: outcome.exact_cost,
            price: outcome.price,
            price_yes: outcome.price_yes,
            price_no: outcome.price_no,
            balance: outcome.balance,
            yes_shares: outcome.yes_shares,
            no_shares: outcome.no_shares,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutResponse {
    pub user_id: UserId,
    pub shares: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl From<&Payout> for PayoutResponse {
    fn from(payout: &Payout) -> Self {
        PayoutResponse {
            user_id: payout.user_id,
            shares: payout.shares,
            amount: payout.amount,
            balance: payout.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub market: MarketResponse,
    pub payouts: Vec<PayoutResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub total_shares: u64,
    pub avg_price: f64,
    pub mark_price: f64,
}

impl From<&PositionView> for PositionResponse {
    fn from(view: &PositionView) -> Self {
        PositionResponse {
            market_id: view.position.market_id,
            outcome: view.position.outcome,
            total_shares: view.position.total_shares,
            avg_price: view.position.avg_price,
            mark_price: view.mark_price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub is_bot: bool,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<PositionResponse>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            balance: user.balance,
            is_bot: user.is_bot,
            created_at: user.created_at.timestamp(),
            positions: None,
        }
    }
}

impl From<UserPortfolio> for UserResponse {
    fn from(portfolio: UserPortfolio) -> Self {
        let positions = portfolio.positions.iter().map(PositionResponse::from).collect();
        UserResponse {
            positions: Some(positions),
            ..UserResponse::from(portfolio.user)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryResponse {
    pub trade_id: TradeId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub action: Side,
    pub shares: u64,
    pub price: f64,
    pub total_cost: f64,
    pub timestamp: i64,
}

impl From<&TradeHistoryEntry> for TradeHistoryResponse {
    fn from(entry: &TradeHistoryEntry) -> Self {
        TradeHistoryResponse {
            trade_id: entry.trade_id,
            market_id: entry.market_id,
            outcome: entry.outcome,
            action: entry.action,
            shares: entry.shares,
            price: entry.price,
            total_cost: entry.total_cost,
            timestamp: entry.timestamp.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorKind,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        ErrorResponse {
            code,
            message: message.into(),
        }
    }
}
