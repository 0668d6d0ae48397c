use crate::domain::{MarketId, Outcome, Side, Timestamp, TradeId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Append-only ledger record of one committed trade
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: TradeId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub side: Side,
    /// Signed share delta: positive for buys, negative for sells
    pub shares: i64,
    /// Exact LMSR cost; negative for a sell refund
    pub cost: f64,
    /// Amount moved on the balance, `ceil(cost)`
    #[serde(with = "rust_decimal::serde::float")]
    pub charged: Decimal,
    pub timestamp: Timestamp,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
        side: Side,
        shares: u64,
        cost: f64,
        charged: Decimal,
        timestamp: Timestamp,
    ) -> Self {
        Trade {
            id: TradeId::new_v4(),
            user_id,
            market_id,
            outcome,
            side,
            shares: side.signed(shares),
            cost,
            charged,
            timestamp,
        }
    }

    /// Unsigned share count
    pub fn quantity(&self) -> u64 {
        self.shares.unsigned_abs()
    }
}

impl PartialEq for Trade {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Trade {}

/// Per-trade row for a user's profit and loss view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryEntry {
    pub trade_id: TradeId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub action: Side,
    pub shares: u64,
    /// Cost per share
    pub price: f64,
    /// Absolute LMSR cost of the trade
    pub total_cost: f64,
    pub timestamp: Timestamp,
}

impl From<&Trade> for TradeHistoryEntry {
    fn from(trade: &Trade) -> Self {
        let shares = trade.quantity();
        TradeHistoryEntry {
            trade_id: trade.id,
            user_id: trade.user_id,
            market_id: trade.market_id,
            outcome: trade.outcome,
            action: trade.side,
            shares,
            price: trade.cost / trade.shares as f64,
            total_cost: trade.cost.abs(),
            timestamp: trade.timestamp,
        }
    }
}
