//! Port for the transactional ledger store
//!
//! Follows Interface Segregation Principle with focused traits. Reads are
//! plain lookups; every multi-record mutation goes through `LedgerWriter`,
//! which applies it as one all-or-nothing unit.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::StoreError;
use crate::domain::{
    Market, MarketId, Outcome, Position, Timestamp, Trade, TradeHistoryEntry, User, UserId,
};

/// Read operations for markets
#[async_trait]
pub trait MarketReader: Send + Sync {
    async fn get_market(&self, id: MarketId) -> Result<Option<Market>, StoreError>;

    /// All markets ordered by id
    async fn list_markets(&self) -> Result<Vec<Market>, StoreError>;
}

/// Write operations for markets outside of trading
#[async_trait]
pub trait MarketWriter: Send + Sync {
    async fn create_market(
        &self,
        title: String,
        description: String,
        created_at: Timestamp,
    ) -> Result<Market, StoreError>;
}

/// Read operations for users
#[async_trait]
pub trait UserReader: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// All users ordered by id
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// Write operations for users outside of trading
#[async_trait]
pub trait UserWriter: Send + Sync {
    async fn create_user(
        &self,
        name: String,
        balance: Decimal,
        is_bot: bool,
        created_at: Timestamp,
    ) -> Result<User, StoreError>;

    /// Overwrite a balance
    async fn set_balance(&self, id: UserId, balance: Decimal) -> Result<User, StoreError>;

    /// Add to a balance
    async fn credit(&self, id: UserId, amount: Decimal) -> Result<User, StoreError>;
}

/// Read operations for positions
#[async_trait]
pub trait PositionReader: Send + Sync {
    async fn get_position(
        &self,
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
    ) -> Result<Option<Position>, StoreError>;

    async fn positions_for_market(&self, market_id: MarketId) -> Result<Vec<Position>, StoreError>;

    async fn positions_for_user(&self, user_id: UserId) -> Result<Vec<Position>, StoreError>;
}

/// Read operations for the append-only trade log
#[async_trait]
pub trait TradeLogReader: Send + Sync {
    /// Every trade in commit order
    async fn all_trades(&self) -> Result<Vec<Trade>, StoreError>;

    /// Trade history rows for a user, newest first
    async fn history_for_user(&self, user_id: UserId)
    -> Result<Vec<TradeHistoryEntry>, StoreError>;
}

/// A fully priced trade ready to be applied.
///
/// The `expected_*` fields are the state the price was computed from. The
/// store refuses the commit with [`StoreError::Conflict`] if any of them
/// moved in the meantime.
#[derive(Debug, Clone)]
pub struct TradeCommit {
    pub trade: Trade,
    pub expected_version: u64,
    pub expected_position_shares: u64,
    /// The position as it must look after the trade
    pub position: Position,
}

/// Post-commit state returned from [`LedgerWriter::commit_trade`]
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub market: Market,
    pub balance: Decimal,
}

/// Terminal resolution of a market
#[derive(Debug, Clone)]
pub struct ResolutionCommit {
    pub market_id: MarketId,
    pub expected_version: u64,
    /// `None` closes the market with no winner
    pub outcome: Option<Outcome>,
    pub note: Option<String>,
    pub resolved_at: Timestamp,
}

/// Credit paid to one holder of the winning outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub user_id: UserId,
    pub shares: u64,
    pub amount: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct ResolutionReceipt {
    pub market: Market,
    pub payouts: Vec<Payout>,
}

/// Atomic multi-record writes
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Debit the balance, shift market shares, write the position and append
    /// the trade, or do none of it.
    async fn commit_trade(&self, commit: TradeCommit) -> Result<TradeReceipt, StoreError>;

    /// Mark the market resolved and credit one unit per winning share, or do
    /// none of it.
    async fn commit_resolution(
        &self,
        resolution: ResolutionCommit,
    ) -> Result<ResolutionReceipt, StoreError>;
}

/// Combined ledger repository trait
#[async_trait]
pub trait LedgerRepository:
    MarketReader
    + MarketWriter
    + UserReader
    + UserWriter
    + PositionReader
    + TradeLogReader
    + LedgerWriter
{
}

// Blanket implementation
impl<T> LedgerRepository for T where
    T: MarketReader
        + MarketWriter
        + UserReader
        + UserWriter
        + PositionReader
        + TradeLogReader
        + LedgerWriter
{
}
