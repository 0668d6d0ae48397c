use serde::Serialize;

/// Caller-facing failure categories shared by every use case.
///
/// Write conflicts never appear here: they are retried inside the use case
/// and only an exhausted retry budget surfaces, as `StoreFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientBalance,
    InsufficientShares,
    InvalidState,
    StoreFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::InsufficientShares => "INSUFFICIENT_SHARES",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::StoreFailure => "STORE_FAILURE",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
