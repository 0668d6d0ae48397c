use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a binary question
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn opposite(&self) -> Outcome {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "yes",
            Outcome::No => "no",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Outcome {
    type Error = &'static str;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "yes" => Ok(Outcome::Yes),
            "no" => Ok(Outcome::No),
            _ => Err("Invalid outcome: must be yes or no"),
        }
    }
}

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Side::Sell)
    }

    /// Signed share delta: positive for a buy, negative for a sell
    #[inline]
    pub fn signed(&self, shares: u64) -> i64 {
        let shares = shares as i64;
        match self {
            Side::Buy => shares,
            Side::Sell => -shares,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Side {
    type Error = &'static str;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err("Invalid side: must be buy or sell"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Outcome::try_from("YES"), Ok(Outcome::Yes));
        assert_eq!(Side::try_from("Sell"), Ok(Side::Sell));
        assert!(Outcome::try_from("maybe").is_err());
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(Side::Buy.signed(5), 5);
        assert_eq!(Side::Sell.signed(5), -5);
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&Outcome::No).unwrap(), "\"no\"");
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"buy\"");
    }
}
