//! Bot Swarm
//!
//! Random traders that keep markets moving. Each cycle a fraction of the bot
//! population places one trade each through the regular trade use case, so
//! bots get exactly the same validation and atomicity as any other caller.
//! Trade rejections are expected (a bot selling shares it does not hold) and
//! are only logged.

use super::{ErrorKind, ExecuteTradeUseCase, TradeCommand};
use crate::application::ports::{EventPublisher, LedgerRepository, SnapshotWriter, StoreError};
use crate::domain::{Clock, Market, Outcome, Side, UserId};
use parking_lot::Mutex;
use rand::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Configuration for the bot swarm
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Delay between trading cycles
    pub interval_ms: u64,
    /// Share of bots that trade in a cycle (at least one always does)
    pub active_fraction: f64,
    /// Balance given to newly created bots
    pub initial_balance: Decimal,
    /// Bots below this balance are topped up before trading
    pub min_balance: Decimal,
    pub refill_amount: Decimal,
    /// Upper bound of the per-trade share count
    pub max_shares: u64,
    pub buy_probability: f64,
    /// Random seed (for reproducibility)
    pub seed: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            active_fraction: 0.2,
            initial_balance: Decimal::from(50_000),
            min_balance: Decimal::from(10_000),
            refill_amount: Decimal::from(20_000),
            max_shares: 10,
            buy_probability: 0.6,
            seed: None,
        }
    }
}

impl BotConfig {
    /// Bots trading per cycle for a population of `count`
    pub fn active_bots(&self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        ((count as f64 * self.active_fraction).floor() as usize).clamp(1, count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub running: bool,
    pub bot_count: usize,
}

/// What a bot decided to do in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotIntent {
    pub market_index: usize,
    pub side: Side,
    pub outcome: Outcome,
    pub shares: u64,
}

/// Pick a random trade against one of `market_count` open markets
pub fn decide<R: Rng + ?Sized>(
    config: &BotConfig,
    market_count: usize,
    rng: &mut R,
) -> Option<BotIntent> {
    if market_count == 0 {
        return None;
    }
    let side = if rng.gen_bool(config.buy_probability.clamp(0.0, 1.0)) {
        Side::Buy
    } else {
        Side::Sell
    };
    let outcome = if rng.gen_bool(0.5) {
        Outcome::Yes
    } else {
        Outcome::No
    };
    Some(BotIntent {
        market_index: rng.gen_range(0..market_count),
        side,
        outcome,
        shares: rng.gen_range(1..=config.max_shares.max(1)),
    })
}

/// Outcome of one trading cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub committed: usize,
    pub refilled: usize,
}

#[derive(Default)]
struct SwarmState {
    bots: Vec<UserId>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

pub struct BotSwarm<C, L, S, E>
where
    C: Clock,
    L: LedgerRepository,
    S: SnapshotWriter,
    E: EventPublisher,
{
    clock: Arc<C>,
    ledger: Arc<L>,
    trader: Arc<ExecuteTradeUseCase<C, L, S, E>>,
    config: BotConfig,
    state: Mutex<SwarmState>,
}

impl<C, L, S, E> BotSwarm<C, L, S, E>
where
    C: Clock + 'static,
    L: LedgerRepository + 'static,
    S: SnapshotWriter + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(
        clock: Arc<C>,
        ledger: Arc<L>,
        trader: Arc<ExecuteTradeUseCase<C, L, S, E>>,
        config: BotConfig,
    ) -> Self {
        Self {
            clock,
            ledger,
            trader,
            config,
            state: Mutex::new(SwarmState::default()),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Start trading with `count` bots. A running swarm is restarted.
    pub async fn start(self: &Arc<Self>, count: usize) -> Result<BotStatus, BotError> {
        if count == 0 {
            return Err(BotError::InvalidCount(count));
        }
        self.stop().await;

        let bots = self.ensure_bots(count).await?;
        let (tx, rx) = watch::channel(false);

        let swarm = Arc::clone(self);
        let task_bots = bots.clone();
        let handle = tokio::spawn(async move {
            swarm.run(task_bots, rx).await;
        });

        {
            let mut state = self.state.lock();
            state.bots = bots;
            state.shutdown = Some(tx);
            state.handle = Some(handle);
        }

        info!(bots = count, interval_ms = self.config.interval_ms, "Bot swarm started");
        Ok(self.status())
    }

    /// Stop the trading loop and wait for the in-flight cycle to finish
    pub async fn stop(&self) -> BotStatus {
        let (shutdown, handle) = {
            let mut state = self.state.lock();
            (state.shutdown.take(), state.handle.take())
        };

        if let Some(tx) = shutdown {
            let _ = tx.send(true);
        }
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Bot swarm task ended abnormally");
            }
            info!("Bot swarm stopped");
        }
        self.status()
    }

    pub fn status(&self) -> BotStatus {
        let state = self.state.lock();
        let running = state
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        BotStatus {
            running,
            bot_count: if running { state.bots.len() } else { 0 },
        }
    }

    /// Make sure at least `count` bot users exist; returns the first `count`
    /// by id. Missing bots are named `bot_<n>` and funded with the initial
    /// balance.
    pub async fn ensure_bots(&self, count: usize) -> Result<Vec<UserId>, BotError> {
        let mut bots: Vec<UserId> = self
            .ledger
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.is_bot)
            .map(|u| u.id)
            .collect();

        let existing = bots.len();
        for n in existing + 1..=count {
            let bot = self
                .ledger
                .create_user(
                    format!("bot_{n}"),
                    self.config.initial_balance,
                    true,
                    self.clock.now(),
                )
                .await?;
            bots.push(bot.id);
        }
        if count > existing {
            debug!(created = count - existing, "Created bot users");
        }

        bots.truncate(count);
        Ok(bots)
    }

    async fn run(&self, bots: Vec<UserId>, mut shutdown: watch::Receiver<bool>) {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut ticker = interval(Duration::from_millis(self.config.interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle(&bots, &mut rng).await {
                        Ok(report) => debug!(
                            attempted = report.attempted,
                            committed = report.committed,
                            refilled = report.refilled,
                            "Bot cycle complete"
                        ),
                        Err(e) => warn!(error = %e, "Bot cycle failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// One trading cycle over `bots`
    pub async fn run_cycle<R: Rng + Send>(
        &self,
        bots: &[UserId],
        rng: &mut R,
    ) -> Result<CycleReport, BotError> {
        let markets: Vec<Market> = self
            .ledger
            .list_markets()
            .await?
            .into_iter()
            .filter(Market::is_open)
            .collect();

        let mut report = CycleReport::default();
        if markets.is_empty() || bots.is_empty() {
            return Ok(report);
        }

        let active: Vec<UserId> = bots
            .choose_multiple(rng, self.config.active_bots(bots.len()))
            .copied()
            .collect();

        for bot in active {
            if self.refill_if_low(bot).await? {
                report.refilled += 1;
            }

            let Some(intent) = decide(&self.config, markets.len(), rng) else {
                continue;
            };
            let command = TradeCommand {
                user_id: bot,
                market_id: markets[intent.market_index].id,
                outcome: intent.outcome,
                side: intent.side,
                shares: intent.shares,
            };

            report.attempted += 1;
            match self.trader.execute(command).await {
                Ok(_) => report.committed += 1,
                Err(e) => debug!(user_id = %bot, error = %e, "Bot trade rejected"),
            }
        }
        Ok(report)
    }

    async fn refill_if_low(&self, bot: UserId) -> Result<bool, BotError> {
        let Some(user) = self.ledger.get_user(bot).await? else {
            return Ok(false);
        };
        if user.balance >= self.config.min_balance {
            return Ok(false);
        }
        let user = self.ledger.credit(bot, self.config.refill_amount).await?;
        debug!(user_id = %bot, balance = %user.balance, "Refilled bot balance");
        Ok(true)
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("bot count must be positive, got {0}")]
    InvalidCount(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::InvalidCount(_) => ErrorKind::Validation,
            BotError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}
