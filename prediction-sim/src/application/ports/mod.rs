mod event_publisher;
mod ledger_repository;
mod market_data_repository;
mod store_error;

pub use event_publisher::EventPublisher;
pub use ledger_repository::{
    LedgerRepository, LedgerWriter, MarketReader, MarketWriter, Payout, PositionReader,
    ResolutionCommit, ResolutionReceipt, TradeCommit, TradeLogReader, TradeReceipt, UserReader,
    UserWriter,
};
pub use market_data_repository::{
    CandleReader, CandleRepository, CandleWriter, SnapshotReader, SnapshotRepository,
    SnapshotWriter,
};
pub use store_error::StoreError;
