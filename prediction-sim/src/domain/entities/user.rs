use crate::domain::{Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Play-money account. The ledger never lets `balance` go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    /// Owned by the bot swarm
    pub is_bot: bool,
    pub created_at: Timestamp,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, balance: Decimal, created_at: Timestamp) -> Self {
        User {
            id,
            name: name.into(),
            balance,
            is_bot: false,
            created_at,
        }
    }

    pub fn bot(id: UserId, name: impl Into<String>, balance: Decimal, created_at: Timestamp) -> Self {
        User {
            is_bot: true,
            ..Self::new(id, name, balance, created_at)
        }
    }
}
