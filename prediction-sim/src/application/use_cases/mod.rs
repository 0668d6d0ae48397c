mod admin;
mod aggregate_candles;
mod bot_swarm;
mod error;
mod execute_trade;
mod market_locks;
mod market_queries;
mod resolve_market;

pub use admin::{AdminError, AdminUseCase};
pub use aggregate_candles::{CandleAggregator, CandleError, ROLLUP_LOOKBACK_BUCKETS, TickReport};
pub use bot_swarm::{BotConfig, BotError, BotIntent, BotStatus, BotSwarm, CycleReport, decide};
pub use error::ErrorKind;
pub use execute_trade::{
    ExecuteTradeUseCase, MAX_COMMIT_ATTEMPTS, TradeCommand, TradeError, TradeOutcome, charge_for,
};
pub use market_locks::MarketLocks;
pub use market_queries::{
    DEFAULT_CANDLE_LIMIT, MarketDetail, MarketQueryUseCase, MarketSummary, PositionView,
    PricePoint, QueryError, UserPortfolio,
};
pub use resolve_market::{ResolveCommand, ResolveError, ResolveMarketUseCase, ResolveResult};
