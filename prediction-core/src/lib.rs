//! Shared kernel for the prediction market: identifiers, outcome and
//! timeframe value objects, LMSR pricing and candle math.
//!
//! No async, no I/O. Everything in here is deterministic and unit tested.

pub mod candles;
pub mod pricing;
pub mod value_objects;

// Re-export value objects at crate root for convenience
pub use value_objects::{
    MarketId, MarketStatus, Outcome, Side, Timeframe, Timestamp, TradeId, UnknownTimeframe, UserId,
};

// Re-export pricing at crate root
pub use pricing::{DEFAULT_LIQUIDITY, Lmsr, PricingError, Prices};

// Re-export candle math at crate root
pub use candles::{Ohlc, group_by_bucket};
