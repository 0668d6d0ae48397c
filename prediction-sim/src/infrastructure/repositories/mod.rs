mod in_memory_candle;
mod in_memory_ledger;
mod in_memory_snapshot;

pub use in_memory_candle::InMemoryCandleRepository;
pub use in_memory_ledger::InMemoryLedgerRepository;
pub use in_memory_snapshot::InMemorySnapshotRepository;
