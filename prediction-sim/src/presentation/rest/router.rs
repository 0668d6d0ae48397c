use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{admin_handlers, handlers};
use crate::application::use_cases::{
    AdminUseCase, BotSwarm, ExecuteTradeUseCase, MarketQueryUseCase, ResolveMarketUseCase,
};
use crate::domain::Clock;
use crate::infrastructure::{
    BroadcastEventPublisher, InMemoryCandleRepository, InMemoryLedgerRepository,
    InMemorySnapshotRepository,
};

pub type Trader<C> = ExecuteTradeUseCase<
    C,
    InMemoryLedgerRepository,
    InMemorySnapshotRepository,
    BroadcastEventPublisher,
>;
pub type Resolver<C> = ResolveMarketUseCase<C, InMemoryLedgerRepository, BroadcastEventPublisher>;
pub type Queries =
    MarketQueryUseCase<InMemoryLedgerRepository, InMemorySnapshotRepository, InMemoryCandleRepository>;
pub type Admin<C> = AdminUseCase<C, InMemoryLedgerRepository, BroadcastEventPublisher>;
pub type Bots<C> = BotSwarm<
    C,
    InMemoryLedgerRepository,
    InMemorySnapshotRepository,
    BroadcastEventPublisher,
>;

/// Application state shared across handlers - uses concrete infrastructure types
///
/// The use cases are built once so that trades, resolutions and bots share
/// the same per-market lock table.
pub struct AppState<C: Clock> {
    pub clock: Arc<C>,
    pub event_publisher: Arc<BroadcastEventPublisher>,
    pub trader: Arc<Trader<C>>,
    pub resolver: Arc<Resolver<C>>,
    pub queries: Arc<Queries>,
    pub admin: Arc<Admin<C>>,
    pub bots: Arc<Bots<C>>,
    /// Swarm size when a start request names none
    pub default_bot_count: usize,
}

/// Create the REST API router
pub fn create_router<C: Clock + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::<C>))
        // Markets
        .route("/api/markets", get(handlers::list_markets::<C>))
        .route("/api/markets/{id}", get(handlers::get_market::<C>))
        .route("/api/markets/{id}/candles", get(handlers::get_candles::<C>))
        .route("/api/markets/{id}/trade", post(handlers::trade::<C>))
        .route("/api/markets/{id}/resolve", post(handlers::resolve::<C>))
        // Users
        .route("/api/users/{id}", get(handlers::get_user::<C>))
        .route("/api/users/{id}/trades", get(handlers::get_user_trades::<C>))
        // Admin
        .route("/admin/markets", post(admin_handlers::create_market::<C>))
        .route("/admin/users", post(admin_handlers::create_user::<C>))
        .route(
            "/admin/users/{id}/balance",
            post(admin_handlers::set_balance::<C>),
        )
        .route("/admin/bots/start", post(admin_handlers::start_bots::<C>))
        .route("/admin/bots/stop", post(admin_handlers::stop_bots::<C>))
        .route("/admin/bots/status", get(admin_handlers::bot_status::<C>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
