//! Prediction Market Simulator
//!
//! A play-money binary prediction market priced by an LMSR market maker,
//! with live OHLC candles and WebSocket fanout.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture with clear separation of concerns:
//!
//! - **Domain**: Core entities and wire events (Market, User, Position, Trade, etc.)
//! - **Application**: Use cases and port interfaces (ExecuteTrade, ResolveMarket, etc.)
//! - **Infrastructure**: Implementations of ports (in-memory stores, SimulationClock, etc.)
//! - **Presentation**: REST API and WebSocket handlers
//!
//! # Features
//!
//! - Atomic trades against an LMSR market maker with integer charges
//! - Resolution with exactly-once payouts
//! - 5s candles rolled up to 1m, 5m, 15m and 1h
//! - Per-market and per-user WebSocket channels
//! - A bot swarm that keeps the markets moving
//!
//! # Example
//!
//! ```ignore
//! use prediction_sim::{App, AppConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::from_config(AppConfig::with_demo_markets()).unwrap();
//!     app.run().await.unwrap();
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types
pub use domain::{
    Candle, Clock, ControllableClock, Lmsr, Market, MarketEvent, MarketId, MarketStatus, Outcome,
    Position, PriceSnapshot, Prices, Side, Timeframe, Timestamp, Trade, TradeId, User,
    UserId,
};

pub use infrastructure::{
    AppConfig, BroadcastEventPublisher, ConfigError, InMemoryCandleRepository,
    InMemoryLedgerRepository, InMemorySnapshotRepository, SimulationClock,
};

pub use application::{
    AdminUseCase, CandleAggregator, ErrorKind, ExecuteTradeUseCase, MarketLocks,
    MarketQueryUseCase, ResolveCommand, ResolveMarketUseCase, TradeCommand, TradeOutcome,
};

pub use presentation::{AppState, WsState, create_router};

use application::use_cases::{AdminError, BotError};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Candle aggregator wired to the in-memory stores
pub type Aggregator<C> = CandleAggregator<
    C,
    InMemoryLedgerRepository,
    InMemorySnapshotRepository,
    InMemoryCandleRepository,
    BroadcastEventPublisher,
>;

/// The assembled market server
pub struct App<C: Clock + 'static> {
    pub config: AppConfig,
    pub clock: Arc<C>,
    pub ledger: Arc<InMemoryLedgerRepository>,
    pub snapshots: Arc<InMemorySnapshotRepository>,
    pub candles: Arc<InMemoryCandleRepository>,
    pub event_publisher: Arc<BroadcastEventPublisher>,
    pub state: Arc<AppState<C>>,
    pub aggregator: Arc<Aggregator<C>>,
    shutdown: watch::Sender<bool>,
}

impl<C: Clock + 'static> App<C> {
    /// Create a new app with the given clock
    pub fn with_clock(config: AppConfig, clock: Arc<C>) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = config.market.engine()?;

        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let snapshots = Arc::new(InMemorySnapshotRepository::new());
        let candles = Arc::new(InMemoryCandleRepository::new());
        let event_publisher = Arc::new(BroadcastEventPublisher::new(config.server.event_capacity));
        let locks = MarketLocks::new();

        let trader = Arc::new(ExecuteTradeUseCase::new(
            Arc::clone(&clock),
            Arc::clone(&ledger),
            Arc::clone(&snapshots),
            Arc::clone(&event_publisher),
            locks.clone(),
            engine,
        ));
        let resolver = Arc::new(ResolveMarketUseCase::new(
            Arc::clone(&clock),
            Arc::clone(&ledger),
            Arc::clone(&event_publisher),
            locks,
            engine,
        ));
        let queries = Arc::new(
            MarketQueryUseCase::new(
                Arc::clone(&ledger),
                Arc::clone(&snapshots),
                Arc::clone(&candles),
                engine,
            )
            .with_candle_limit(config.candles.history_limit),
        );
        let admin = Arc::new(AdminUseCase::new(
            Arc::clone(&clock),
            Arc::clone(&ledger),
            Arc::clone(&event_publisher),
        ));
        let bots = Arc::new(application::BotSwarm::new(
            Arc::clone(&clock),
            Arc::clone(&ledger),
            Arc::clone(&trader),
            config.bots.to_bot_config(),
        ));

        let aggregator = Arc::new(CandleAggregator::new(
            Arc::clone(&clock),
            Arc::clone(&ledger),
            Arc::clone(&snapshots),
            Arc::clone(&candles),
            Arc::clone(&event_publisher),
        ));

        let state = Arc::new(AppState {
            clock: Arc::clone(&clock),
            event_publisher: Arc::clone(&event_publisher),
            trader,
            resolver,
            queries,
            admin,
            bots,
            default_bot_count: config.bots.count,
        });

        let (shutdown, _) = watch::channel(false);

        Ok(App {
            config,
            clock,
            ledger,
            snapshots,
            candles,
            event_publisher,
            state,
            aggregator,
            shutdown,
        })
    }

    /// Create the seed markets and users from the configuration
    pub async fn seed(&self) -> Result<(), AdminError> {
        for market in &self.config.markets {
            self.state
                .admin
                .create_market(&market.title, &market.description)
                .await?;
        }
        for user in &self.config.users {
            self.state.admin.create_user(&user.name, user.balance).await?;
        }
        tracing::info!(
            markets = self.config.markets.len(),
            users = self.config.users.len(),
            "Seed data loaded"
        );
        Ok(())
    }

    /// Create the combined REST and WebSocket router
    pub fn router(&self) -> Router {
        let ws_state = Arc::new(
            WsState::new(Arc::clone(&self.event_publisher), Arc::clone(&self.ledger))
                .with_max_subscriptions(self.config.server.max_subscriptions),
        );
        create_router(Arc::clone(&self.state)).route(
            "/ws",
            axum::routing::get(presentation::ws_handler).with_state(ws_state),
        )
    }

    /// Start the candle job and, if enabled, the bot swarm
    pub async fn spawn_background(&self) -> Result<Vec<JoinHandle<()>>, BotError> {
        let mut handles = Vec::new();
        if self.config.candles.enabled {
            handles.push(infrastructure::spawn_candle_job(
                Arc::clone(&self.aggregator),
                Duration::from_millis(self.config.candles.tick_interval_ms),
                self.shutdown.subscribe(),
            ));
        }
        if self.config.bots.enabled {
            self.state.bots.start(self.config.bots.count).await?;
        }
        Ok(handles)
    }

    /// Stop background jobs
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.state.bots.stop().await;
    }

    /// Serve on an already bound listener until ctrl-c
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let router = self.router();
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutdown requested");
            })
            .await?;
        self.shutdown().await;
        Ok(())
    }

    /// Run the market server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);

        self.seed().await?;
        self.spawn_background().await?;

        tracing::info!("Prediction market listening on {}", addr);

        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }
}

impl App<SimulationClock> {
    /// Create a new app with a wall-clock simulation clock
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SimulationClock::new()))
    }

    /// Create a new app with fixed time (for testing)
    pub fn fixed_time(config: AppConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SimulationClock::fixed()))
    }
}
