use super::ErrorKind;
use crate::application::ports::{CandleReader, LedgerRepository, SnapshotReader, StoreError};
use crate::domain::{
    Candle, Lmsr, Market, MarketId, Position, Prices, Timeframe, Timestamp, TradeHistoryEntry,
    User, UserId,
};
use std::sync::Arc;
use thiserror::Error;

/// Candles returned per read when no limit is configured
pub const DEFAULT_CANDLE_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct MarketSummary {
    pub market: Market,
    pub prices: Prices,
}

/// One point of the `price_yes` series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price_yes: f64,
}

#[derive(Debug, Clone)]
pub struct MarketDetail {
    pub market: Market,
    pub prices: Prices,
    pub history: Vec<PricePoint>,
}

#[derive(Debug, Clone)]
pub struct PositionView {
    pub position: Position,
    /// Current price of the held outcome, 1 or 0 once resolved
    pub mark_price: f64,
}

#[derive(Debug, Clone)]
pub struct UserPortfolio {
    pub user: User,
    pub positions: Vec<PositionView>,
}

/// Read path over markets, users and candles
pub struct MarketQueryUseCase<L, S, K>
where
    L: LedgerRepository,
    S: SnapshotReader,
    K: CandleReader,
{
    ledger: Arc<L>,
    snapshots: Arc<S>,
    candles: Arc<K>,
    engine: Lmsr,
    candle_limit: usize,
}

impl<L, S, K> MarketQueryUseCase<L, S, K>
where
    L: LedgerRepository,
    S: SnapshotReader,
    K: CandleReader,
{
    pub fn new(ledger: Arc<L>, snapshots: Arc<S>, candles: Arc<K>, engine: Lmsr) -> Self {
        Self {
            ledger,
            snapshots,
            candles,
            engine,
            candle_limit: DEFAULT_CANDLE_LIMIT,
        }
    }

    pub fn with_candle_limit(mut self, limit: usize) -> Self {
        self.candle_limit = limit.max(1);
        self
    }

    pub fn engine(&self) -> &Lmsr {
        &self.engine
    }

    pub async fn list_markets(&self) -> Result<Vec<MarketSummary>, QueryError> {
        let markets = self.ledger.list_markets().await?;
        Ok(markets
            .into_iter()
            .map(|market| MarketSummary {
                prices: market.prices(&self.engine),
                market,
            })
            .collect())
    }

    pub async fn market_detail(&self, market_id: MarketId) -> Result<MarketDetail, QueryError> {
        let market = self.market(market_id).await?;
        let history = self
            .snapshots
            .history(market_id)
            .await?
            .into_iter()
            .map(|s| PricePoint {
                timestamp: s.timestamp,
                price_yes: s.price_yes,
            })
            .collect();

        Ok(MarketDetail {
            prices: market.prices(&self.engine),
            market,
            history,
        })
    }

    /// Most recent candles, oldest first
    pub async fn candles(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, QueryError> {
        self.market(market_id).await?;
        Ok(self
            .candles
            .latest_candles(market_id, timeframe, self.candle_limit)
            .await?)
    }

    pub async fn user_portfolio(&self, user_id: UserId) -> Result<UserPortfolio, QueryError> {
        let user = self.user(user_id).await?;
        let mut positions = Vec::new();
        for position in self.ledger.positions_for_user(user_id).await? {
            let mark_price = match self.ledger.get_market(position.market_id).await? {
                Some(market) => mark_price(&market, &self.engine, &position),
                None => 0.0,
            };
            positions.push(PositionView {
                position,
                mark_price,
            });
        }
        Ok(UserPortfolio { user, positions })
    }

    /// Trade history, newest first
    pub async fn trade_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<TradeHistoryEntry>, QueryError> {
        self.user(user_id).await?;
        Ok(self.ledger.history_for_user(user_id).await?)
    }

    async fn market(&self, market_id: MarketId) -> Result<Market, QueryError> {
        self.ledger
            .get_market(market_id)
            .await?
            .ok_or(QueryError::MarketNotFound(market_id))
    }

    async fn user(&self, user_id: UserId) -> Result<User, QueryError> {
        self.ledger
            .get_user(user_id)
            .await?
            .ok_or(QueryError::UserNotFound(user_id))
    }
}

fn mark_price(market: &Market, engine: &Lmsr, position: &Position) -> f64 {
    if market.is_open() {
        return market.prices(engine).of(position.outcome);
    }
    match market.resolution {
        Some(winner) if winner == position.outcome => 1.0,
        _ => 0.0,
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::MarketNotFound(_) | QueryError::UserNotFound(_) => ErrorKind::NotFound,
            QueryError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CandleWriter, MarketWriter, SnapshotWriter, UserWriter};
    use crate::domain::{Ohlc, PriceSnapshot};
    use crate::infrastructure::{
        InMemoryCandleRepository, InMemoryLedgerRepository, InMemorySnapshotRepository,
    };
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn queries(
        ledger: &Arc<InMemoryLedgerRepository>,
        snapshots: &Arc<InMemorySnapshotRepository>,
        candles: &Arc<InMemoryCandleRepository>,
    ) -> MarketQueryUseCase<InMemoryLedgerRepository, InMemorySnapshotRepository, InMemoryCandleRepository>
    {
        MarketQueryUseCase::new(
            Arc::clone(ledger),
            Arc::clone(snapshots),
            Arc::clone(candles),
            Lmsr::default(),
        )
    }

    #[tokio::test]
    async fn test_list_markets_with_prices() {
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let snapshots = Arc::new(InMemorySnapshotRepository::new());
        let candles = Arc::new(InMemoryCandleRepository::new());
        ledger.create_market("A".into(), String::new(), Utc::now()).await.unwrap();
        ledger.create_market("B".into(), String::new(), Utc::now()).await.unwrap();

        let markets = queries(&ledger, &snapshots, &candles).list_markets().await.unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].market.title, "A");
        assert_eq!(markets[0].prices.yes, 0.5);
    }

    #[tokio::test]
    async fn test_market_detail_carries_history() {
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let snapshots = Arc::new(InMemorySnapshotRepository::new());
        let candles = Arc::new(InMemoryCandleRepository::new());
        let market = ledger
            .create_market("A".into(), String::new(), Utc::now())
            .await
            .unwrap();

        let start = Utc::now();
        for (i, yes) in [0.5, 0.55, 0.6].into_iter().enumerate() {
            snapshots
                .append(PriceSnapshot::new(
                    market.id,
                    Prices { yes, no: 1.0 - yes },
                    start + Duration::seconds(i as i64),
                ))
                .await
                .unwrap();
        }

        let detail = queries(&ledger, &snapshots, &candles)
            .market_detail(market.id)
            .await
            .unwrap();
        let series: Vec<f64> = detail.history.iter().map(|p| p.price_yes).collect();
        assert_eq!(series, vec![0.5, 0.55, 0.6]);

        let missing = queries(&ledger, &snapshots, &candles)
            .market_detail(MarketId::new(77))
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_candles_capped_to_most_recent() {
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let snapshots = Arc::new(InMemorySnapshotRepository::new());
        let candles = Arc::new(InMemoryCandleRepository::new());
        let market = ledger
            .create_market("A".into(), String::new(), Utc::now())
            .await
            .unwrap();
        for i in 0..10 {
            candles
                .upsert_candle(Candle::new(market.id, Timeframe::S5, i * 5, Ohlc::flat(0.5)))
                .await
                .unwrap();
        }

        let bars = queries(&ledger, &snapshots, &candles)
            .with_candle_limit(3)
            .candles(market.id, Timeframe::S5)
            .await
            .unwrap();
        let starts: Vec<i64> = bars.iter().map(|c| c.bucket_start).collect();
        assert_eq!(starts, vec![35, 40, 45]);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let snapshots = Arc::new(InMemorySnapshotRepository::new());
        let candles = Arc::new(InMemoryCandleRepository::new());
        let q = queries(&ledger, &snapshots, &candles);

        assert!(matches!(
            q.user_portfolio(UserId::new(5)).await,
            Err(QueryError::UserNotFound(_))
        ));
        assert!(matches!(
            q.trade_history(UserId::new(5)).await,
            Err(QueryError::UserNotFound(_))
        ));

        let user = ledger
            .create_user("bob".into(), dec!(100), false, Utc::now())
            .await
            .unwrap();
        let portfolio = q.user_portfolio(user.id).await.unwrap();
        assert_eq!(portfolio.user.balance, dec!(100));
        assert!(portfolio.positions.is_empty());
    }
}
