//! Candle aggregation
//!
//! A tick builds base (5s) candles from price snapshots, then walks the
//! roll-up chain 5s → 1m → 5m → 15m → 1h, each level reading only the level
//! below it. Base buckets are upserted while open; every roll-up bucket is
//! written once, after it has closed, and never touched again.

use super::ErrorKind;
use crate::application::ports::{
    CandleRepository, EventPublisher, MarketReader, SnapshotReader, StoreError,
};
use crate::domain::{
    Candle, CandleUpdateEvent, Clock, MarketEvent, MarketId, Ohlc, Timeframe, Timestamp,
    group_by_bucket,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Target buckets covered by each roll-up pass
pub const ROLLUP_LOOKBACK_BUCKETS: i64 = 20;

/// What one tick wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub markets: usize,
    pub base_written: usize,
    pub rollups_written: usize,
    pub failed_markets: usize,
}

impl TickReport {
    pub fn written(&self) -> usize {
        self.base_written + self.rollups_written
    }
}

pub struct CandleAggregator<C, M, S, K, E>
where
    C: Clock,
    M: MarketReader,
    S: SnapshotReader,
    K: CandleRepository,
    E: EventPublisher,
{
    clock: Arc<C>,
    markets: Arc<M>,
    snapshots: Arc<S>,
    candles: Arc<K>,
    event_publisher: Arc<E>,
}

impl<C, M, S, K, E> CandleAggregator<C, M, S, K, E>
where
    C: Clock,
    M: MarketReader,
    S: SnapshotReader,
    K: CandleRepository,
    E: EventPublisher,
{
    pub fn new(
        clock: Arc<C>,
        markets: Arc<M>,
        snapshots: Arc<S>,
        candles: Arc<K>,
        event_publisher: Arc<E>,
    ) -> Self {
        Self {
            clock,
            markets,
            snapshots,
            candles,
            event_publisher,
        }
    }

    /// Aggregate every market at the clock's current time.
    ///
    /// A failure on one market is logged and does not stop the others.
    pub async fn run_tick(&self) -> Result<TickReport, CandleError> {
        let now = self.clock.now_secs();
        let markets = self.markets.list_markets().await?;

        let mut report = TickReport {
            markets: markets.len(),
            ..TickReport::default()
        };
        for market in markets {
            match self.tick_market(market.id, now).await {
                Ok((base, rollups)) => {
                    report.base_written += base;
                    report.rollups_written += rollups;
                }
                Err(e) => {
                    warn!(market_id = %market.id, error = %e, "Candle aggregation failed");
                    report.failed_markets += 1;
                }
            }
        }

        if report.written() > 0 {
            debug!(
                base = report.base_written,
                rollups = report.rollups_written,
                "Candle tick complete"
            );
        }
        Ok(report)
    }

    /// Base stage then the roll-up chain for one market at `now` (Unix
    /// seconds). Returns `(base, rollups)` written.
    pub async fn tick_market(
        &self,
        market_id: MarketId,
        now: i64,
    ) -> Result<(usize, usize), CandleError> {
        let base = self.aggregate_base(market_id, now).await?;
        let rollups = self.roll_up(market_id, now).await?;
        Ok((base, rollups))
    }

    /// Rebuild the just-closed and the currently open base buckets from
    /// snapshots. Idle windows produce nothing.
    pub async fn aggregate_base(&self, market_id: MarketId, now: i64) -> Result<usize, CandleError> {
        let width = Timeframe::BASE.seconds();
        let open_bucket = Timeframe::BASE.bucket_start(now);
        let closed_bucket = open_bucket - width;

        let mut snapshots = self
            .snapshots
            .snapshots_between(
                market_id,
                at_secs(closed_bucket)?,
                at_secs(open_bucket + width)?,
            )
            .await?;
        snapshots.sort_by_key(|s| s.timestamp);

        let grouped = group_by_bucket(snapshots, Timeframe::BASE, |s| s.timestamp.timestamp());

        let mut written = 0;
        for (bucket, members) in grouped {
            let Some(ohlc) = Ohlc::from_prices(members.iter().map(|s| s.price_yes)) else {
                continue;
            };
            let candle = Candle::new(market_id, Timeframe::BASE, bucket, ohlc);

            let existing = self
                .candles
                .get_candle(market_id, Timeframe::BASE, bucket)
                .await?;
            if existing.as_ref() == Some(&candle) {
                continue;
            }

            self.candles.upsert_candle(candle.clone()).await?;
            self.publish(&candle).await;
            written += 1;
        }
        Ok(written)
    }

    /// Walk every roll-up level in order, finest first
    pub async fn roll_up(&self, market_id: MarketId, now: i64) -> Result<usize, CandleError> {
        let open_bucket = Timeframe::BASE.bucket_start(now);
        let mut written = 0;
        for (source, target) in Timeframe::ROLLUPS {
            written += self
                .roll_up_level(market_id, source, target, open_bucket)
                .await?;
        }
        Ok(written)
    }

    /// Derive missing closed `target` buckets from `source` candles.
    ///
    /// A target bucket is closed once `bucket_start + width <= open_bucket`.
    /// Buckets that already exist are skipped, so re-running is a no-op.
    pub async fn roll_up_level(
        &self,
        market_id: MarketId,
        source: Timeframe,
        target: Timeframe,
        open_bucket: i64,
    ) -> Result<usize, CandleError> {
        let width = target.seconds();
        let since = target.bucket_start(open_bucket - width * ROLLUP_LOOKBACK_BUCKETS);

        let members = self
            .candles
            .candles_since(market_id, source, since)
            .await?;
        let grouped = group_by_bucket(members, target, |c| c.bucket_start);

        let closed: Vec<i64> = grouped
            .keys()
            .copied()
            .filter(|bucket| bucket + width <= open_bucket)
            .collect();
        if closed.is_empty() {
            return Ok(0);
        }
        let existing = self
            .candles
            .existing_buckets(market_id, target, &closed)
            .await?;

        let mut written = 0;
        for bucket in closed {
            if existing.contains(&bucket) {
                continue;
            }
            let Some(ohlc) = grouped
                .get(&bucket)
                .and_then(|group| Ohlc::merge(group.iter().map(|c| c.ohlc)))
            else {
                continue;
            };

            let candle = Candle::new(market_id, target, bucket, ohlc);
            if self.candles.insert_candle_if_absent(candle.clone()).await? {
                self.publish(&candle).await;
                written += 1;
            }
        }
        Ok(written)
    }

    async fn publish(&self, candle: &Candle) {
        self.event_publisher
            .publish_to_market(
                candle.market_id,
                MarketEvent::CandleUpdate(CandleUpdateEvent::from(candle)),
            )
            .await;
    }
}

fn at_secs(secs: i64) -> Result<Timestamp, CandleError> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(CandleError::TimeOutOfRange(secs))
}

#[derive(Debug, Error)]
pub enum CandleError {
    #[error("timestamp {0} is out of range")]
    TimeOutOfRange(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CandleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CandleError::TimeOutOfRange(_) => ErrorKind::Validation,
            CandleError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}
