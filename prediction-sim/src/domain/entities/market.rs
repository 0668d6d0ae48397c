//! Binary-outcome market with aggregate LMSR share state.

use crate::domain::{Lmsr, MarketId, MarketStatus, Outcome, Prices, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: MarketId,
    pub title: String,
    pub description: String,
    pub status: MarketStatus,
    /// Outstanding YES shares across all holders
    pub yes_shares: u64,
    /// Outstanding NO shares across all holders
    pub no_shares: u64,
    pub resolution: Option<Outcome>,
    pub resolution_note: Option<String>,
    /// Bumped on every committed mutation
    pub version: u64,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Market {
    pub fn new(
        id: MarketId,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Market {
            id,
            title: title.into(),
            description: description.into(),
            status: MarketStatus::Open,
            yes_shares: 0,
            no_shares: 0,
            resolution: None,
            resolution_note: None,
            version: 0,
            created_at,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Outstanding shares of one outcome
    pub fn shares(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Yes => self.yes_shares,
            Outcome::No => self.no_shares,
        }
    }

    /// `(yes, no)` after shifting `outcome` by a signed delta.
    ///
    /// Returns `None` if the aggregate would go negative or overflow.
    pub fn shifted(&self, outcome: Outcome, delta: i64) -> Option<(u64, u64)> {
        let current = self.shares(outcome);
        let next = if delta >= 0 {
            current.checked_add(delta.unsigned_abs())?
        } else {
            current.checked_sub(delta.unsigned_abs())?
        };
        Some(match outcome {
            Outcome::Yes => (next, self.no_shares),
            Outcome::No => (self.yes_shares, next),
        })
    }

    pub fn prices(&self, engine: &Lmsr) -> Prices {
        engine.prices(self.yes_shares, self.no_shares)
    }
}
