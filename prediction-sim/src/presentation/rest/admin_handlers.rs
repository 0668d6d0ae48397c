//! Admin handlers for market setup and the bot swarm
//!
//! There is no authentication: these routes exist to seed and drive a
//! local simulation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;

use crate::application::use_cases::BotStatus;
use crate::domain::{Clock, UserId};
use crate::presentation::rest::dto::{MarketResponse, UserResponse};
use crate::presentation::rest::{ApiError, router::AppState};

/// Default starting balance for users created without one
pub const DEFAULT_USER_BALANCE: i64 = 1000;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default = "default_user_balance")]
    pub balance: Decimal,
}

fn default_user_balance() -> Decimal {
    Decimal::from(DEFAULT_USER_BALANCE)
}

#[derive(Debug, Deserialize)]
pub struct SetBalanceRequest {
    pub balance: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartBotsRequest {
    #[serde(default)]
    pub count: Option<usize>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /admin/markets
pub async fn create_market<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<MarketResponse>), ApiError> {
    let market = state.admin.create_market(&req.title, &req.description).await?;
    let prices = market.prices(state.queries.engine());
    Ok((StatusCode::CREATED, Json(MarketResponse::new(market, prices))))
}

/// POST /admin/users
pub async fn create_user<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.admin.create_user(&req.name, req.balance).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /admin/users/{id}/balance
pub async fn set_balance<C: Clock>(
    Path(user_id): Path<UserId>,
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<SetBalanceRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.admin.set_balance(user_id, req.balance).await?;
    Ok(Json(user.into()))
}

/// POST /admin/bots/start
///
/// Without a count the configured swarm size is used.
pub async fn start_bots<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
    body: Option<Json<StartBotsRequest>>,
) -> Result<Json<BotStatus>, ApiError> {
    let count = body
        .and_then(|Json(req)| req.count)
        .unwrap_or(state.default_bot_count);
    let status = state.bots.start(count).await?;
    Ok(Json(status))
}

/// POST /admin/bots/stop
pub async fn stop_bots<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<BotStatus> {
    Json(state.bots.stop().await)
}

/// GET /admin/bots/status
pub async fn bot_status<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<BotStatus> {
    Json(state.bots.status())
}
