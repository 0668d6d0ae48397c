//! Candle timeframes and the roll-up pipeline between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5s")]
    S5,
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeframe '{0}': expected one of 5s, 1m, 5m, 15m, 1h")]
pub struct UnknownTimeframe(pub String);

impl Timeframe {
    /// Every timeframe, finest first
    pub const ALL: [Timeframe; 5] = [
        Timeframe::S5,
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
    ];

    /// The base timeframe built directly from price snapshots
    pub const BASE: Timeframe = Timeframe::S5;

    /// (source, target) pairs in the order they must be rolled up
    pub const ROLLUPS: [(Timeframe, Timeframe); 4] = [
        (Timeframe::S5, Timeframe::M1),
        (Timeframe::M1, Timeframe::M5),
        (Timeframe::M5, Timeframe::M15),
        (Timeframe::M15, Timeframe::H1),
    ];

    /// Bucket width in seconds
    pub const fn seconds(&self) -> i64 {
        match self {
            Timeframe::S5 => 5,
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3600,
        }
    }

    /// Start of the bucket containing `unix_secs`
    #[inline]
    pub const fn bucket_start(&self, unix_secs: i64) -> i64 {
        unix_secs.div_euclid(self.seconds()) * self.seconds()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::S5 => "5s",
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| UnknownTimeframe(s.to_string()))
    }
}
