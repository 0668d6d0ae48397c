use super::{ErrorKind, MarketLocks, MAX_COMMIT_ATTEMPTS};
use crate::application::ports::{
    EventPublisher, LedgerRepository, Payout, ResolutionCommit, ResolutionReceipt, StoreError,
};
use crate::domain::{
    BalanceUpdateEvent, Clock, Lmsr, Market, MarketEvent, MarketId, MarketUpdateEvent, Outcome,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ResolveCommand {
    pub market_id: MarketId,
    /// `None` closes the market without paying anyone
    pub outcome: Option<Outcome>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub market: Market,
    pub payouts: Vec<Payout>,
}

/// Terminal transition of a market to `resolved`
pub struct ResolveMarketUseCase<C, L, E>
where
    C: Clock,
    L: LedgerRepository,
    E: EventPublisher,
{
    clock: Arc<C>,
    ledger: Arc<L>,
    event_publisher: Arc<E>,
    locks: MarketLocks,
    engine: Lmsr,
}

impl<C, L, E> ResolveMarketUseCase<C, L, E>
where
    C: Clock,
    L: LedgerRepository,
    E: EventPublisher,
{
    pub fn new(
        clock: Arc<C>,
        ledger: Arc<L>,
        event_publisher: Arc<E>,
        locks: MarketLocks,
        engine: Lmsr,
    ) -> Self {
        Self {
            clock,
            ledger,
            event_publisher,
            locks,
            engine,
        }
    }

    pub async fn execute(&self, command: ResolveCommand) -> Result<ResolveResult, ResolveError> {
        let _guard = self.locks.lock(command.market_id).await;

        let mut attempt = 1;
        let receipt = loop {
            match self.try_commit(&command).await {
                Ok(receipt) => break receipt,
                Err(ResolveError::Store(e)) if e.is_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(market_id = %command.market_id, attempt, error = %e, "Resolution conflicted, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let ResolutionReceipt { market, payouts } = receipt;
        let paid: u64 = payouts.iter().map(|p| p.shares).sum();
        info!(
            market_id = %market.id,
            outcome = ?market.resolution,
            holders = payouts.len(),
            paid,
            "Market resolved"
        );

        for payout in &payouts {
            self.event_publisher
                .publish_to_user(
                    payout.user_id,
                    MarketEvent::BalanceUpdate(BalanceUpdateEvent {
                        user_id: payout.user_id,
                        balance: payout.balance,
                    }),
                )
                .await;
        }

        let resolved_at = market.resolved_at.unwrap_or_else(|| self.clock.now());
        self.event_publisher
            .publish_to_market(
                market.id,
                MarketEvent::MarketUpdate(MarketUpdateEvent::new(
                    &market,
                    market.prices(&self.engine),
                    resolved_at,
                )),
            )
            .await;

        Ok(ResolveResult { market, payouts })
    }

    async fn try_commit(&self, command: &ResolveCommand) -> Result<ResolutionReceipt, ResolveError> {
        let market = self
            .ledger
            .get_market(command.market_id)
            .await?
            .ok_or(ResolveError::MarketNotFound(command.market_id))?;
        if !market.is_open() {
            return Err(ResolveError::AlreadyResolved(command.market_id));
        }

        let receipt = self
            .ledger
            .commit_resolution(ResolutionCommit {
                market_id: market.id,
                expected_version: market.version,
                outcome: command.outcome,
                note: command.note.clone(),
                resolved_at: self.clock.now(),
            })
            .await?;
        Ok(receipt)
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("market {0} is already resolved")]
    AlreadyResolved(MarketId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::MarketNotFound(_) => ErrorKind::NotFound,
            ResolveError::AlreadyResolved(_) => ErrorKind::InvalidState,
            ResolveError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}
