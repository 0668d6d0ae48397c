use thiserror::Error;

/// Failures reported by any store port
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A precondition captured at read time no longer holds. Retryable.
    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    /// The write would break a ledger invariant
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}
