mod ids;
mod outcome;
mod timeframe;

pub use ids::{MarketId, UserId};
pub use outcome::{Outcome, Side};
pub use timeframe::{Timeframe, UnknownTimeframe};

use serde::{Deserialize, Serialize};

pub type TradeId = uuid::Uuid;
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Lifecycle of a market. Resolution is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    #[default]
    Open,
    Resolved,
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, MarketStatus::Open)
    }
}
