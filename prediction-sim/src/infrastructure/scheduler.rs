//! Background jobs driven by a tokio interval.

use crate::application::ports::{CandleRepository, EventPublisher, MarketReader, SnapshotReader};
use crate::application::use_cases::CandleAggregator;
use crate::domain::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

/// Run the candle aggregator every `period` until `shutdown` flips to true
/// or its sender is dropped.
///
/// Ticks that overrun are skipped rather than bunched up.
pub fn spawn_candle_job<C, M, S, K, E>(
    aggregator: Arc<CandleAggregator<C, M, S, K, E>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    C: Clock + 'static,
    M: MarketReader + 'static,
    S: SnapshotReader + 'static,
    K: CandleRepository + 'static,
    E: EventPublisher + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis() as u64, "Candle job started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = aggregator.run_tick().await {
                        warn!(error = %e, "Candle tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Candle job stopped");
    })
}
