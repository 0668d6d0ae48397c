//! A user's holding of one outcome in one market.

use crate::domain::{MarketId, Outcome, UserId};
use serde::{Deserialize, Serialize};

/// Store key for a position
pub type PositionKey = (UserId, MarketId, Outcome);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub total_shares: u64,
    /// Volume-weighted average entry cost per share
    pub avg_price: f64,
}

impl Position {
    /// Empty position, used before the first buy
    pub fn new(user_id: UserId, market_id: MarketId, outcome: Outcome) -> Self {
        Position {
            user_id,
            market_id,
            outcome,
            total_shares: 0,
            avg_price: 0.0,
        }
    }

    pub fn key(&self) -> PositionKey {
        (self.user_id, self.market_id, self.outcome)
    }

    /// Total entry cost of the shares held
    pub fn cost_basis(&self) -> f64 {
        self.total_shares as f64 * self.avg_price
    }

    /// The position after buying `shares` for `cost`, computed from this
    /// snapshot without re-reading anything.
    pub fn after_buy(&self, shares: u64, cost: f64) -> Position {
        let total_shares = self.total_shares + shares;
        Position {
            total_shares,
            avg_price: (self.cost_basis() + cost) / total_shares as f64,
            ..self.clone()
        }
    }

    /// The position after selling `shares`. `avg_price` is unchanged.
    ///
    /// `None` when fewer than `shares` are held.
    pub fn after_sell(&self, shares: u64) -> Option<Position> {
        Some(Position {
            total_shares: self.total_shares.checked_sub(shares)?,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn empty() -> Position {
        Position::new(UserId::new(1), MarketId::new(1), Outcome::Yes)
    }

    #[test]
    fn test_first_buy_sets_average() {
        let p = empty().after_buy(10, 5.6);
        assert_eq!(p.total_shares, 10);
        assert_relative_eq!(p.avg_price, 0.56);
    }

    #[test]
    fn test_second_buy_weights_average() {
        let p = empty().after_buy(10, 5.0).after_buy(10, 7.0);
        assert_eq!(p.total_shares, 20);
        assert_relative_eq!(p.avg_price, 0.6);
    }

    #[test]
    fn test_sell_keeps_average_and_checks_holdings() {
        let p = empty().after_buy(10, 5.0);
        let sold = p.after_sell(4).unwrap();
        assert_eq!(sold.total_shares, 6);
        assert_relative_eq!(sold.avg_price, 0.5);

        assert!(p.after_sell(11).is_none());
        assert_eq!(p.after_sell(10).unwrap().total_shares, 0);
    }
}
