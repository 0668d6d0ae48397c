pub mod ports;
pub mod use_cases;

pub use ports::{
    CandleRepository, EventPublisher, LedgerRepository, SnapshotRepository, StoreError,
};
pub use use_cases::{
    AdminError, AdminUseCase, BotConfig, BotStatus, BotSwarm, CandleAggregator, ErrorKind,
    ExecuteTradeUseCase, MarketLocks, MarketQueryUseCase, QueryError, ResolveCommand,
    ResolveError, ResolveMarketUseCase, TradeCommand, TradeError, TradeOutcome,
};
