pub mod clock;
pub mod config;
pub mod event_publisher;
pub mod repositories;
pub mod scheduler;

pub use clock::SimulationClock;
pub use config::{
    AppConfig, BotsConfig, CandleConfig, ConfigError, MarketMakerConfig, SeedMarket, SeedUser,
    ServerConfig,
};
pub use event_publisher::BroadcastEventPublisher;
pub use repositories::{
    InMemoryCandleRepository, InMemoryLedgerRepository, InMemorySnapshotRepository,
};
pub use scheduler::spawn_candle_job;
