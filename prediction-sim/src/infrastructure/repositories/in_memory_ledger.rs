use crate::application::ports::{
    LedgerWriter, MarketReader, MarketWriter, Payout, PositionReader, ResolutionCommit,
    ResolutionReceipt, StoreError, TradeCommit, TradeLogReader, TradeReceipt, UserReader,
    UserWriter,
};
use crate::domain::{
    Market, MarketId, MarketStatus, Outcome, Position, PositionKey, Timestamp, Trade,
    TradeHistoryEntry, User, UserId,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory ledger
///
/// Markets, users and positions live in DashMaps; the trade log and the
/// history rows are append-only vectors. Multi-record commits hold the
/// market's shard guard for their whole duration and take further guards
/// in a fixed order (markets, users, positions), so a commit is applied
/// completely or not at all and never deadlocks against another.
pub struct InMemoryLedgerRepository {
    markets: Arc<DashMap<MarketId, Market>>,
    users: Arc<DashMap<UserId, User>>,
    positions: Arc<DashMap<PositionKey, Position>>,
    trades: Arc<RwLock<Vec<Trade>>>,
    history: Arc<RwLock<Vec<TradeHistoryEntry>>>,
    next_market_id: Arc<AtomicU64>,
    next_user_id: Arc<AtomicU64>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self {
            markets: Arc::new(DashMap::new()),
            users: Arc::new(DashMap::new()),
            positions: Arc::new(DashMap::new()),
            trades: Arc::new(RwLock::new(Vec::new())),
            history: Arc::new(RwLock::new(Vec::new())),
            next_market_id: Arc::new(AtomicU64::new(1)),
            next_user_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn trade_count(&self) -> usize {
        self.trades.read().len()
    }
}

impl Default for InMemoryLedgerRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryLedgerRepository {
    fn clone(&self) -> Self {
        Self {
            markets: Arc::clone(&self.markets),
            users: Arc::clone(&self.users),
            positions: Arc::clone(&self.positions),
            trades: Arc::clone(&self.trades),
            history: Arc::clone(&self.history),
            next_market_id: Arc::clone(&self.next_market_id),
            next_user_id: Arc::clone(&self.next_user_id),
        }
    }
}

#[async_trait]
impl MarketReader for InMemoryLedgerRepository {
    async fn get_market(&self, id: MarketId) -> Result<Option<Market>, StoreError> {
        Ok(self.markets.get(&id).map(|m| m.value().clone()))
    }

    async fn list_markets(&self) -> Result<Vec<Market>, StoreError> {
        let mut markets: Vec<Market> = self.markets.iter().map(|m| m.value().clone()).collect();
        markets.sort_by_key(|m| m.id);
        Ok(markets)
    }
}

#[async_trait]
impl MarketWriter for InMemoryLedgerRepository {
    async fn create_market(
        &self,
        title: String,
        description: String,
        created_at: Timestamp,
    ) -> Result<Market, StoreError> {
        let id = MarketId::new(self.next_market_id.fetch_add(1, Ordering::SeqCst));
        let market = Market::new(id, title, description, created_at);
        self.markets.insert(id, market.clone());
        Ok(market)
    }
}

#[async_trait]
impl UserReader for InMemoryLedgerRepository {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[async_trait]
impl UserWriter for InMemoryLedgerRepository {
    async fn create_user(
        &self,
        name: String,
        balance: Decimal,
        is_bot: bool,
        created_at: Timestamp,
    ) -> Result<User, StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::Rejected(format!("negative balance {balance}")));
        }
        let id = UserId::new(self.next_user_id.fetch_add(1, Ordering::SeqCst));
        let user = if is_bot {
            User::bot(id, name, balance, created_at)
        } else {
            User::new(id, name, balance, created_at)
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn set_balance(&self, id: UserId, balance: Decimal) -> Result<User, StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::Rejected(format!("negative balance {balance}")));
        }
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.balance = balance;
        Ok(user.clone())
    }

    async fn credit(&self, id: UserId, amount: Decimal) -> Result<User, StoreError> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        let balance = user.balance + amount;
        if balance < Decimal::ZERO {
            return Err(StoreError::Rejected(format!(
                "credit of {amount} would leave user {id} at {balance}"
            )));
        }
        user.balance = balance;
        Ok(user.clone())
    }
}

#[async_trait]
impl PositionReader for InMemoryLedgerRepository {
    async fn get_position(
        &self,
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
    ) -> Result<Option<Position>, StoreError> {
        Ok(self
            .positions
            .get(&(user_id, market_id, outcome))
            .map(|p| p.value().clone()))
    }

    async fn positions_for_market(&self, market_id: MarketId) -> Result<Vec<Position>, StoreError> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|p| p.market_id == market_id)
            .map(|p| p.value().clone())
            .collect();
        positions.sort_by_key(Position::key);
        Ok(positions)
    }

    async fn positions_for_user(&self, user_id: UserId) -> Result<Vec<Position>, StoreError> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.value().clone())
            .collect();
        positions.sort_by_key(Position::key);
        Ok(positions)
    }
}

#[async_trait]
impl TradeLogReader for InMemoryLedgerRepository {
    async fn all_trades(&self) -> Result<Vec<Trade>, StoreError> {
        Ok(self.trades.read().clone())
    }


    async fn history_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<TradeHistoryEntry>, StoreError> {
        Ok(self
            .history
            .read()
            .iter()
            .rev()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedgerRepository {
    async fn commit_trade(&self, commit: TradeCommit) -> Result<TradeReceipt, StoreError> {
        let TradeCommit {
            trade,
            expected_version,
            expected_position_shares,
            position,
        } = commit;

        let key = (trade.user_id, trade.market_id, trade.outcome);
        if position.key() != key {
            return Err(StoreError::Rejected(format!(
                "position {:?} does not belong to trade {}",
                position.key(),
                trade.id
            )));
        }

        // Validate everything before the first write
        let mut market = self
            .markets
            .get_mut(&trade.market_id)
            .ok_or_else(|| StoreError::NotFound(format!("market {}", trade.market_id)))?;
        if market.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "market {} at version {}, expected {}",
                market.id, market.version, expected_version
            )));
        }
        if !market.is_open() {
            return Err(StoreError::Conflict(format!("market {} is resolved", market.id)));
        }
        let (yes_shares, no_shares) = market
            .shifted(trade.outcome, trade.shares)
            .ok_or_else(|| {
                StoreError::Rejected(format!(
                    "market {} {} shares cannot move by {}",
                    market.id, trade.outcome, trade.shares
                ))
            })?;

        let mut user = self
            .users
            .get_mut(&trade.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", trade.user_id)))?;
        let balance = user.balance - trade.charged;
        if balance < Decimal::ZERO {
            return Err(StoreError::Conflict(format!(
                "user {} balance {} cannot cover {}",
                user.id, user.balance, trade.charged
            )));
        }

        let held = self
            .positions
            .get(&key)
            .map(|p| p.total_shares)
            .unwrap_or(0);
        if held != expected_position_shares {
            return Err(StoreError::Conflict(format!(
                "position holds {held} shares, expected {expected_position_shares}"
            )));
        }

        market.yes_shares = yes_shares;
        market.no_shares = no_shares;
        market.version += 1;
        user.balance = balance;
        self.positions.insert(key, position);

        let entry = TradeHistoryEntry::from(&trade);
        self.trades.write().push(trade);
        self.history.write().push(entry);

        Ok(TradeReceipt {
            market: market.clone(),
            balance,
        })
    }

    async fn commit_resolution(
        &self,
        resolution: ResolutionCommit,
    ) -> Result<ResolutionReceipt, StoreError> {
        let mut market = self
            .markets
            .get_mut(&resolution.market_id)
            .ok_or_else(|| StoreError::NotFound(format!("market {}", resolution.market_id)))?;
        if market.version != resolution.expected_version || !market.is_open() {
            return Err(StoreError::Conflict(format!(
                "market {} changed before resolution",
                market.id
            )));
        }

        let mut winners: Vec<(UserId, u64)> = match resolution.outcome {
            Some(outcome) => self
                .positions
                .iter()
                .filter(|p| {
                    p.market_id == resolution.market_id
                        && p.outcome == outcome
                        && p.total_shares > 0
                })
                .map(|p| (p.user_id, p.total_shares))
                .collect(),
            None => Vec::new(),
        };
        winners.sort_by_key(|(user_id, _)| *user_id);

        if let Some((missing, _)) = winners.iter().find(|(id, _)| !self.users.contains_key(id)) {
            return Err(StoreError::Rejected(format!(
                "winning position held by unknown user {missing}"
            )));
        }

        let mut payouts = Vec::with_capacity(winners.len());
        for (user_id, shares) in winners {
            if let Some(mut user) = self.users.get_mut(&user_id) {
                let amount = Decimal::from(shares);
                user.balance += amount;
                payouts.push(Payout {
                    user_id,
                    shares,
                    amount,
                    balance: user.balance,
                });
            }
        }

        market.status = MarketStatus::Resolved;
        market.resolution = resolution.outcome;
        market.resolution_note = resolution.note;
        market.resolved_at = Some(resolution.resolved_at);
        market.version += 1;

        Ok(ResolutionReceipt {
            market: market.clone(),
            payouts,
        })
    }
}
