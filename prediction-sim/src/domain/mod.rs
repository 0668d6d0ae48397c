pub mod entities;
pub mod events;
pub mod services;

// Re-export shared kernel types
pub use prediction_core::{
    Lmsr, MarketId, MarketStatus, Ohlc, Outcome, Prices, PricingError, Side, Timeframe, Timestamp,
    TradeId, UnknownTimeframe, UserId, group_by_bucket,
};

// Re-export entity types
pub use entities::{
    Candle, Market, Position, PositionKey, PriceSnapshot, Trade, TradeHistoryEntry, User,
};

// Re-export events
pub use events::{
    BalanceUpdateEvent, CandleUpdateEvent, HistoryPoint, MarketEvent, MarketUpdateEvent,
};

// Re-export services
pub use services::{Clock, ControllableClock};
