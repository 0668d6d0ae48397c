//! Configuration loading for the prediction market simulator
//!
//! Supports JSON configuration files for:
//! - Server settings and event channel sizing
//! - Market maker liquidity
//! - Candle scheduling
//! - The bot swarm
//! - Seed markets and users

use crate::application::use_cases::{BotConfig, DEFAULT_CANDLE_LIMIT};
use crate::domain::{Lmsr, PricingError};
use prediction_core::DEFAULT_LIQUIDITY;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Root configuration for the simulator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub market: MarketMakerConfig,

    #[serde(default)]
    pub candles: CandleConfig,

    #[serde(default)]
    pub bots: BotsConfig,

    /// Markets to create on startup
    #[serde(default)]
    pub markets: Vec<SeedMarket>,

    /// Users to create on startup
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// A small demo setup: a handful of markets and one funded user
    pub fn with_demo_markets() -> Self {
        Self {
            markets: vec![
                SeedMarket::new("Will it rain in Lisbon tomorrow?"),
                SeedMarket::new("Will the launch happen on schedule?"),
                SeedMarket::new("Will the home team win the final?"),
            ],
            users: vec![SeedUser {
                name: "demo".to_string(),
                balance: Decimal::from(1000),
            }],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market.engine()?;

        let bots = &self.bots;
        if !(0.0..=1.0).contains(&bots.active_fraction) {
            return Err(ConfigError::Invalid(format!(
                "bots.active_fraction must be within [0, 1], got {}",
                bots.active_fraction
            )));
        }
        if !(0.0..=1.0).contains(&bots.buy_probability) {
            return Err(ConfigError::Invalid(format!(
                "bots.buy_probability must be within [0, 1], got {}",
                bots.buy_probability
            )));
        }
        if bots.max_shares == 0 {
            return Err(ConfigError::Invalid("bots.max_shares must be positive".into()));
        }
        if self.server.max_subscriptions == 0 {
            return Err(ConfigError::Invalid(
                "server.max_subscriptions must be positive".into(),
            ));
        }
        if bots.interval_ms == 0 || self.candles.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("intervals must be positive".into()));
        }

        if let Some(market) = self.markets.iter().find(|m| m.title.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "market with description '{}' has an empty title",
                market.description
            )));
        }
        if let Some(user) = self.users.iter().find(|u| u.balance < Decimal::ZERO) {
            return Err(ConfigError::Invalid(format!(
                "user '{}' has a negative balance",
                user.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-channel broadcast buffer
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Topics one WebSocket connection may hold
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_event_capacity() -> usize {
    1024
}

fn default_max_subscriptions() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            event_capacity: default_event_capacity(),
            max_subscriptions: default_max_subscriptions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMakerConfig {
    /// LMSR liquidity parameter B
    #[serde(default = "default_liquidity")]
    pub liquidity: f64,
}

fn default_liquidity() -> f64 {
    DEFAULT_LIQUIDITY
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            liquidity: default_liquidity(),
        }
    }
}

impl MarketMakerConfig {
    pub fn engine(&self) -> Result<Lmsr, ConfigError> {
        Lmsr::new(self.liquidity).map_err(ConfigError::from)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Candles returned per read
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_history_limit() -> usize {
    DEFAULT_CANDLE_LIMIT
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: default_tick_interval_ms(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotsConfig {
    /// Start the swarm with the server
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bot_count")]
    pub count: usize,
    #[serde(default = "default_bot_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_active_fraction")]
    pub active_fraction: f64,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Decimal,
    #[serde(default = "default_min_balance")]
    pub min_balance: Decimal,
    #[serde(default = "default_refill_amount")]
    pub refill_amount: Decimal,
    #[serde(default = "default_max_shares")]
    pub max_shares: u64,
    #[serde(default = "default_buy_probability")]
    pub buy_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_bot_count() -> usize {
    10
}

fn default_bot_interval_ms() -> u64 {
    2000
}

fn default_active_fraction() -> f64 {
    0.2
}

fn default_initial_balance() -> Decimal {
    Decimal::from(50_000)
}

fn default_min_balance() -> Decimal {
    Decimal::from(10_000)
}

fn default_refill_amount() -> Decimal {
    Decimal::from(20_000)
}

fn default_max_shares() -> u64 {
    10
}

fn default_buy_probability() -> f64 {
    0.6
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: default_bot_count(),
            interval_ms: default_bot_interval_ms(),
            active_fraction: default_active_fraction(),
            initial_balance: default_initial_balance(),
            min_balance: default_min_balance(),
            refill_amount: default_refill_amount(),
            max_shares: default_max_shares(),
            buy_probability: default_buy_probability(),
            seed: None,
        }
    }
}

impl BotsConfig {
    pub fn to_bot_config(&self) -> BotConfig {
        BotConfig {
            interval_ms: self.interval_ms,
            active_fraction: self.active_fraction,
            initial_balance: self.initial_balance,
            min_balance: self.min_balance,
            refill_amount: self.refill_amount,
            max_shares: self.max_shares,
            buy_probability: self.buy_probability,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedMarket {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl SeedMarket {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<PricingError> for ConfigError {
    fn from(e: PricingError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_minimal_config() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_subscriptions, 64);
        assert_eq!(config.market.liquidity, 20.0);
        assert_eq!(config.candles.tick_interval_ms, 5000);
        assert_eq!(config.candles.history_limit, 500);
        assert!(!config.bots.enabled);
        assert!(config.markets.is_empty());
    }

    #[test]
    fn test_parse_seeds_and_bots() {
        let json = r#"{
            "server": { "port": 9000 },
            "bots": { "enabled": true, "count": 25, "seed": 7 },
            "markets": [
                { "title": "Rain?", "description": "Lisbon, tomorrow" },
                { "title": "Snow?" }
            ],
            "users": [ { "name": "alice", "balance": 1500.5 } ]
        }"#;

        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.markets.len(), 2);
        assert_eq!(config.markets[1].description, "");
        assert_eq!(config.users[0].balance, dec!(1500.5));

        let bots = config.bots.to_bot_config();
        assert_eq!(bots.seed, Some(7));
        assert_eq!(bots.interval_ms, 2000);
        assert_eq!(bots.initial_balance, dec!(50000));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            AppConfig::from_json(r#"{ "market": { "liquidity": 0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{ "bots": { "buy_probability": 1.5 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{ "users": [ { "name": "x", "balance": -1 } ] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/prediction.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
