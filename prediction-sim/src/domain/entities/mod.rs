mod candle;
mod market;
mod position;
mod snapshot;
mod trade;
mod user;

pub use candle::Candle;
pub use market::Market;
pub use position::{Position, PositionKey};
pub use snapshot::PriceSnapshot;
pub use trade::{Trade, TradeHistoryEntry};
pub use user::User;
