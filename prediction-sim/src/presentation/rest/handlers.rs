use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use crate::application::ports::EventPublisher;
use crate::application::{ResolveCommand, TradeCommand};
use crate::domain::{Clock, MarketId, Outcome, Side, Timeframe, UserId};
use crate::presentation::rest::{ApiError, dto::*};

use super::AppState;

/// GET /api/health
pub async fn health<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        time: state.clock.now_secs(),
        subscribers: state.event_publisher.subscriber_count(),
    })
}

/// GET /api/markets
pub async fn list_markets<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Vec<MarketResponse>>, ApiError> {
    let markets = state.queries.list_markets().await?;
    Ok(Json(markets.into_iter().map(MarketResponse::from).collect()))
}

/// GET /api/markets/{id}
pub async fn get_market<C: Clock>(
    Path(market_id): Path<MarketId>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<MarketDetailResponse>, ApiError> {
    let detail = state.queries.market_detail(market_id).await?;
    Ok(Json(detail.into()))
}

/// GET /api/markets/{id}/candles?tf=
pub async fn get_candles<C: Clock>(
    Path(market_id): Path<MarketId>,
    Query(query): Query<CandleQuery>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<CandlesResponse>, ApiError> {
    let timeframe = match query.tf.as_deref() {
        None | Some("") => Timeframe::BASE,
        Some(tf) => tf
            .parse::<Timeframe>()
            .map_err(|e| ApiError::validation(e.to_string()))?,
    };

    let candles = state.queries.candles(market_id, timeframe).await?;
    Ok(Json(CandlesResponse {
        market_id,
        timeframe,
        candles: candles.iter().map(CandleResponse::from).collect(),
    }))
}

/// POST /api/markets/{id}/trade
pub async fn trade<C: Clock>(
    Path(market_id): Path<MarketId>,
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<TradeResponse>, ApiError> {
    let outcome = parse_outcome(&req.outcome)?;
    let side: Side = req
        .side
        .as_str()
        .try_into()
        .map_err(|_| ApiError::invalid_parameter("side", "must be buy or sell"))?;
    let shares = req
        .shares
        .as_u64()
        .ok_or_else(|| ApiError::invalid_parameter("shares", "must be a positive integer"))?;

    let outcome = state
        .trader
        .execute(TradeCommand {
            user_id: req.user_id,
            market_id,
            outcome,
            side,
            shares,
        })
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /api/markets/{id}/resolve
pub async fn resolve<C: Clock>(
    Path(market_id): Path<MarketId>,
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let outcome = req.outcome.as_deref().map(parse_outcome).transpose()?;

    let result = state
        .resolver
        .execute(ResolveCommand {
            market_id,
            outcome,
            note: req.note,
        })
        .await?;

    let prices = result.market.prices(state.queries.engine());
    Ok(Json(ResolveResponse {
        payouts: result.payouts.iter().map(PayoutResponse::from).collect(),
        market: MarketResponse::new(result.market, prices),
    }))
}

/// GET /api/users/{id}
pub async fn get_user<C: Clock>(
    Path(user_id): Path<UserId>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<UserResponse>, ApiError> {
    let portfolio = state.queries.user_portfolio(user_id).await?;
    Ok(Json(portfolio.into()))
}

/// GET /api/users/{id}/trades
pub async fn get_user_trades<C: Clock>(
    Path(user_id): Path<UserId>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Vec<TradeHistoryResponse>>, ApiError> {
    let history = state.queries.trade_history(user_id).await?;
    Ok(Json(history.iter().map(TradeHistoryResponse::from).collect()))
}

fn parse_outcome(value: &str) -> Result<Outcome, ApiError> {
    Outcome::try_from(value).map_err(|_| ApiError::invalid_parameter("outcome", "must be yes or no"))
}
