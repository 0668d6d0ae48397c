use super::{ErrorKind, MarketLocks};
use crate::application::ports::{
    EventPublisher, LedgerRepository, SnapshotWriter, StoreError, TradeCommit, TradeReceipt,
};
use crate::domain::{
    BalanceUpdateEvent, Clock, Lmsr, MarketEvent, MarketId, MarketUpdateEvent, Outcome, Position,
    PriceSnapshot, Side, Trade, TradeId, UserId,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Commit attempts before a run of write conflicts is reported as a store failure
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct TradeCommand {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub side: Side,
    pub shares: u64,
}

#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub trade_id: TradeId,
    /// Amount moved on the balance: `ceil(exact_cost)`, negative for a sell
    pub cost: Decimal,
    pub exact_cost: f64,
    /// Post-trade price of the traded outcome
    pub price: f64,
    pub price_yes: f64,
    pub price_no: f64,
    pub balance: Decimal,
    pub yes_shares: u64,
    pub no_shares: u64,
}

pub struct ExecuteTradeUseCase<C, L, S, E>
where
    C: Clock,
    L: LedgerRepository,
    S: SnapshotWriter,
    E: EventPublisher,
{
    clock: Arc<C>,
    ledger: Arc<L>,
    snapshots: Arc<S>,
    event_publisher: Arc<E>,
    locks: MarketLocks,
    engine: Lmsr,
}

impl<C, L, S, E> ExecuteTradeUseCase<C, L, S, E>
where
    C: Clock,
    L: LedgerRepository,
    S: SnapshotWriter,
    E: EventPublisher,
{
    pub fn new(
        clock: Arc<C>,
        ledger: Arc<L>,
        snapshots: Arc<S>,
        event_publisher: Arc<E>,
        locks: MarketLocks,
        engine: Lmsr,
    ) -> Self {
        Self {
            clock,
            ledger,
            snapshots,
            event_publisher,
            locks,
            engine,
        }
    }

    pub async fn execute(&self, command: TradeCommand) -> Result<TradeOutcome, TradeError> {
        if command.shares == 0 {
            return Err(TradeError::InvalidShares);
        }
        if i64::try_from(command.shares).is_err() {
            return Err(TradeError::TradeTooLarge(command.shares));
        }

        // Held through the side effects so snapshots and market_update events
        // for one market are emitted in commit order
        let _guard = self.locks.lock(command.market_id).await;

        let mut attempt = 1;
        let (trade, receipt) = loop {
            match self.try_commit(&command).await {
                Ok(committed) => break committed,
                Err(TradeError::Store(e)) if e.is_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(
                        market_id = %command.market_id,
                        attempt,
                        error = %e,
                        "Trade commit conflicted, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            trade_id = %trade.id,
            market_id = %trade.market_id,
            user_id = %trade.user_id,
            outcome = %trade.outcome,
            shares = trade.shares,
            charged = %trade.charged,
            "Trade committed"
        );

        let market = &receipt.market;
        let prices = market.prices(&self.engine);

        if let Err(e) = self
            .snapshots
            .append(PriceSnapshot::new(market.id, prices, trade.timestamp))
            .await
        {
            warn!(market_id = %market.id, error = %e, "Failed to append price snapshot");
        }

        self.event_publisher
            .publish_to_market(
                market.id,
                MarketEvent::MarketUpdate(MarketUpdateEvent::new(market, prices, trade.timestamp)),
            )
            .await;
        self.event_publisher
            .publish_to_user(
                trade.user_id,
                MarketEvent::BalanceUpdate(BalanceUpdateEvent {
                    user_id: trade.user_id,
                    balance: receipt.balance,
                }),
            )
            .await;

        Ok(TradeOutcome {
            trade_id: trade.id,
            cost: trade.charged,
            exact_cost: trade.cost,
            price: prices.of(trade.outcome),
            price_yes: prices.yes,
            price_no: prices.no,
            balance: receipt.balance,
            yes_shares: market.yes_shares,
            no_shares: market.no_shares,
        })
    }

    /// One read-price-commit pass. Every check runs against the same reads the
    /// cost was computed from.
    async fn try_commit(&self, command: &TradeCommand) -> Result<(Trade, TradeReceipt), TradeError> {
        let market = self
            .ledger
            .get_market(command.market_id)
            .await?
            .ok_or(TradeError::MarketNotFound(command.market_id))?;
        if !market.is_open() {
            return Err(TradeError::MarketClosed(command.market_id));
        }

        let user = self
            .ledger
            .get_user(command.user_id)
            .await?
            .ok_or(TradeError::UserNotFound(command.user_id))?;

        let position = self
            .ledger
            .get_position(command.user_id, command.market_id, command.outcome)
            .await?
            .unwrap_or_else(|| Position::new(command.user_id, command.market_id, command.outcome));

        let next_position = match command.side {
            Side::Buy => None,
            Side::Sell => Some(position.after_sell(command.shares).ok_or(
                TradeError::InsufficientShares {
                    requested: command.shares,
                    held: position.total_shares,
                },
            )?),
        };

        let delta = command.side.signed(command.shares);
        if market.shifted(command.outcome, delta).is_none() {
            return Err(TradeError::TradeTooLarge(command.shares));
        }

        let cost = self
            .engine
            .cost(market.yes_shares, market.no_shares, delta, command.outcome);
        let charged = charge_for(cost).ok_or(TradeError::TradeTooLarge(command.shares))?;

        if user.balance < charged {
            return Err(TradeError::InsufficientBalance {
                required: charged,
                available: user.balance,
            });
        }

        let next_position =
            next_position.unwrap_or_else(|| position.after_buy(command.shares, cost));

        let trade = Trade::new(
            command.user_id,
            command.market_id,
            command.outcome,
            command.side,
            command.shares,
            cost,
            charged,
            self.clock.now(),
        );

        let receipt = self
            .ledger
            .commit_trade(TradeCommit {
                trade: trade.clone(),
                expected_version: market.version,
                expected_position_shares: position.total_shares,
                position: next_position,
            })
            .await?;

        Ok((trade, receipt))
    }
}

/// Balance movement for an exact LMSR cost.
///
/// Always rounds toward positive infinity: a buy pays the next whole unit and
/// a sell refund is truncated toward zero.
pub fn charge_for(cost: f64) -> Option<Decimal> {
    if !cost.is_finite() {
        return None;
    }
    // ceil(-0.4) is -0.0, which Decimal reads as zero
    Decimal::from_f64(cost.ceil())
}

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("shares must be a positive integer")]
    InvalidShares,

    #[error("trade of {0} shares is too large")]
    TradeTooLarge(u64),

    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("market {0} is resolved")]
    MarketClosed(MarketId),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: u64, held: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TradeError::InvalidShares | TradeError::TradeTooLarge(_) => ErrorKind::Validation,
            TradeError::MarketNotFound(_) | TradeError::UserNotFound(_) => ErrorKind::NotFound,
            TradeError::MarketClosed(_) => ErrorKind::InvalidState,
            TradeError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TradeError::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            TradeError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        LedgerWriter, MarketReader, MarketWriter, PositionReader, ResolutionCommit,
        SnapshotReader, TradeLogReader, UserReader, UserWriter,
    };
    use crate::domain::MarketStatus;
    use crate::infrastructure::{
        BroadcastEventPublisher, InMemoryLedgerRepository, InMemorySnapshotRepository,
        SimulationClock,
    };
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    struct Env {
        ledger: Arc<InMemoryLedgerRepository>,
        snapshots: Arc<InMemorySnapshotRepository>,
        publisher: Arc<BroadcastEventPublisher>,
        use_case: ExecuteTradeUseCase<
            SimulationClock,
            InMemoryLedgerRepository,
            InMemorySnapshotRepository,
            BroadcastEventPublisher,
        >,
        market_id: MarketId,
        user_id: UserId,
    }

    async fn setup(balance: Decimal) -> Env {
        let clock = Arc::new(SimulationClock::fixed());
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let snapshots = Arc::new(InMemorySnapshotRepository::new());
        let publisher = Arc::new(BroadcastEventPublisher::new(100));

        let market = ledger
            .create_market("Rain tomorrow?".into(), String::new(), clock.now())
            .await
            .unwrap();
        let user = ledger
            .create_user("alice".into(), balance, false, clock.now())
            .await
            .unwrap();

        let use_case = ExecuteTradeUseCase::new(
            clock,
            Arc::clone(&ledger),
            Arc::clone(&snapshots),
            Arc::clone(&publisher),
            MarketLocks::new(),
            Lmsr::default(),
        );

        Env {
            ledger,
            snapshots,
            publisher,
            use_case,
            market_id: market.id,
            user_id: user.id,
        }
    }

    fn command(env: &Env, side: Side, shares: u64) -> TradeCommand {
        TradeCommand {
            user_id: env.user_id,
            market_id: env.market_id,
            outcome: Outcome::Yes,
            side,
            shares,
        }
    }

    #[test]
    fn test_charge_rounds_toward_positive_infinity() {
        assert_eq!(charge_for(5.618), Some(dec!(6)));
        assert_eq!(charge_for(-5.618), Some(dec!(-5)));
        assert_eq!(charge_for(-0.4), Some(Decimal::ZERO));
        assert_eq!(charge_for(f64::INFINITY), None);
    }

    #[tokio::test]
    async fn test_buy_updates_every_aggregate() {
        let env = setup(dec!(1000)).await;
        let mut market_rx = env.publisher.subscribe_market(env.market_id);
        let mut user_rx = env.publisher.subscribe_user(env.user_id);

        let result = env.use_case.execute(command(&env, Side::Buy, 10)).await.unwrap();

        assert_relative_eq!(result.exact_cost, 5.618596, epsilon = 1e-6);
        assert_eq!(result.cost, dec!(6));
        assert_eq!(result.balance, dec!(994));
        assert_relative_eq!(result.price, 0.622459, epsilon = 1e-6);
        assert_eq!(result.yes_shares, 10);

        let market = env.ledger.get_market(env.market_id).await.unwrap().unwrap();
        assert_eq!(market.yes_shares, 10);
        assert_eq!(market.no_shares, 0);

        let position = env
            .ledger
            .get_position(env.user_id, env.market_id, Outcome::Yes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.total_shares, 10);
        assert_relative_eq!(position.avg_price, 0.5618596, epsilon = 1e-6);

        assert_eq!(env.ledger.all_trades().await.unwrap().len(), 1);
        assert_eq!(env.snapshots.history(env.market_id).await.unwrap().len(), 1);

        assert!(matches!(
            market_rx.try_recv().unwrap(),
            MarketEvent::MarketUpdate(e) if e.yes_shares == 10
        ));
        assert!(matches!(
            user_rx.try_recv().unwrap(),
            MarketEvent::BalanceUpdate(e) if e.balance == dec!(994)
        ));
    }

    #[tokio::test]
    async fn test_buy_then_sell_never_profits() {
        let env = setup(dec!(1000)).await;
        env.use_case.execute(command(&env, Side::Buy, 7)).await.unwrap();
        let sell = env.use_case.execute(command(&env, Side::Sell, 7)).await.unwrap();

        assert!(sell.cost <= Decimal::ZERO);
        assert!(sell.balance <= dec!(1000));
        assert_eq!(sell.yes_shares, 0);

        let position = env
            .ledger
            .get_position(env.user_id, env.market_id, Outcome::Yes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.total_shares, 0);
    }

    #[tokio::test]
    async fn test_rejects_zero_shares() {
        let env = setup(dec!(1000)).await;
        let err = env.use_case.execute(command(&env, Side::Buy, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_state_untouched() {
        let env = setup(dec!(5)).await;
        let err = env.use_case.execute(command(&env, Side::Buy, 10)).await.unwrap_err();

        assert!(matches!(
            err,
            TradeError::InsufficientBalance { required, available }
                if required == dec!(6) && available == dec!(5)
        ));
        let market = env.ledger.get_market(env.market_id).await.unwrap().unwrap();
        assert_eq!(market.yes_shares, 0);
        assert_eq!(market.version, 0);
        assert!(env.ledger.all_trades().await.unwrap().is_empty());
        assert_eq!(
            env.ledger.get_user(env.user_id).await.unwrap().unwrap().balance,
            dec!(5)
        );
    }

    #[tokio::test]
    async fn test_sell_without_position() {
        let env = setup(dec!(1000)).await;
        let err = env.use_case.execute(command(&env, Side::Sell, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientShares);
    }

    #[tokio::test]
    async fn test_unknown_market_and_user() {
        let env = setup(dec!(1000)).await;

        let mut cmd = command(&env, Side::Buy, 1);
        cmd.market_id = MarketId::new(999);
        let err = env.use_case.execute(cmd).await.unwrap_err();
        assert!(matches!(err, TradeError::MarketNotFound(_)));

        let mut cmd = command(&env, Side::Buy, 1);
        cmd.user_id = UserId::new(999);
        let err = env.use_case.execute(cmd).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_resolved_market_rejects_trades() {
        let env = setup(dec!(1000)).await;
        env.ledger
            .commit_resolution(ResolutionCommit {
                market_id: env.market_id,
                expected_version: 0,
                outcome: None,
                note: None,
                resolved_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let market = env.ledger.get_market(env.market_id).await.unwrap().unwrap();
        assert_eq!(market.status, MarketStatus::Resolved);

        let err = env.use_case.execute(command(&env, Side::Buy, 1)).await.unwrap_err();
        assert!(matches!(err, TradeError::MarketClosed(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_history_entry_recorded() {
        let env = setup(dec!(1000)).await;
        env.use_case.execute(command(&env, Side::Buy, 10)).await.unwrap();

        let history = env.ledger.history_for_user(env.user_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].shares, 10);
        assert_eq!(history[0].action, Side::Buy);
        assert_relative_eq!(history[0].price, 0.5618596, epsilon = 1e-6);
    }
}
