//! Integration tests for the REST API
//!
//! Tests the full HTTP stack including:
//! - Market and user setup through the admin routes
//! - Trading, resolution and the error taxonomy
//! - Candle reads and user views
//! - Bot swarm control

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::DateTime;
use prediction_sim::{App, AppConfig, SimulationClock};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Test Fixtures
// ============================================================================

const T0: i64 = 1_700_000_000;

fn create_app() -> App<SimulationClock> {
    let start = DateTime::from_timestamp(T0, 0).unwrap();
    App::with_clock(AppConfig::default(), Arc::new(SimulationClock::at(start))).unwrap()
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// One market and one user with 1000, returns (router, market id, user id)
async fn setup(router: &Router) -> (u64, u64) {
    let (status, market) = send(
        router,
        "POST",
        "/admin/markets",
        Some(json!({"title": "Will it rain?", "description": "Lisbon"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, user) = send(
        router,
        "POST",
        "/admin/users",
        Some(json!({"name": "alice", "balance": 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        market["id"].as_u64().unwrap(),
        user["id"].as_u64().unwrap(),
    )
}

async fn trade(
    router: &Router,
    market: u64,
    user: u64,
    outcome: &str,
    side: &str,
    shares: i64,
) -> (StatusCode, Value) {
    send(
        router,
        "POST",
        &format!("/api/markets/{}/trade", market),
        Some(json!({"userId": user, "outcome": outcome, "side": side, "shares": shares})),
    )
    .await
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_app();
    let (status, body) = send(&app.router(), "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["time"], T0);
}

#[tokio::test]
async fn test_new_market_is_even() {
    let app = create_app();
    let router = app.router();
    let (market, _) = setup(&router).await;

    let (status, body) = send(&router, "GET", "/api/markets", None).await;
    assert_eq!(status, StatusCode::OK);
    let markets = body.as_array().unwrap();
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0]["id"], market);
    assert_eq!(markets[0]["status"], "open");
    assert_eq!(markets[0]["priceYes"], 0.5);
    assert_eq!(markets[0]["yesShares"], 0);
}

#[tokio::test]
async fn test_buy_charges_rounded_cost() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;

    let (status, body) = trade(&router, market, user, "yes", "buy", 10).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cost"], 6.0);
    assert_eq!(body["balance"], 994.0);
    assert_eq!(body["yesShares"], 10);
    assert!((body["exactCost"].as_f64().unwrap() - 5.618596).abs() < 1e-5);
    assert!((body["priceYes"].as_f64().unwrap() - 0.622459).abs() < 1e-5);

    let (_, detail) = send(&router, "GET", &format!("/api/markets/{}", market), None).await;
    assert_eq!(detail["yesShares"], 10);
    let history = detail["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["timestamp"], T0);
}

#[tokio::test]
async fn test_trade_validation_errors() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;

    let (status, body) = trade(&router, market, user, "maybe", "buy", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, _) = trade(&router, market, user, "yes", "hold", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = trade(&router, market, user, "yes", "buy", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, _) = trade(&router, market, user, "yes", "buy", -3).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/markets/{}/trade", market),
        Some(json!({"userId": user, "outcome": "yes", "side": "buy", "shares": 1.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_trade_rejections() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;

    let (status, body) = trade(&router, market, user, "no", "sell", 1).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_SHARES");

    let (status, body) = trade(&router, market, user, "yes", "buy", 5000).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_BALANCE");

    let (status, body) = trade(&router, 99, user, "yes", "buy", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = trade(&router, market, 99, "yes", "buy", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing was written
    let (_, user_view) = send(&router, "GET", &format!("/api/users/{}", user), None).await;
    assert_eq!(user_view["balance"], 1000.0);
    assert!(user_view["positions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_resolution_pays_winners_once() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;
    trade(&router, market, user, "yes", "buy", 10).await;

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/markets/{}/resolve", market),
        Some(json!({"outcome": "yes", "note": "It rained"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["market"]["status"], "resolved");
    assert_eq!(body["market"]["resolution"], "yes");
    assert_eq!(body["market"]["resolutionNote"], "It rained");
    assert_eq!(body["payouts"][0]["amount"], 10.0);
    assert_eq!(body["payouts"][0]["balance"], 1004.0);

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/markets/{}/resolve", market),
        Some(json!({"outcome": "no"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, body) = trade(&router, market, user, "yes", "buy", 1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (_, user_view) = send(&router, "GET", &format!("/api/users/{}", user), None).await;
    assert_eq!(user_view["balance"], 1004.0);
    assert_eq!(user_view["positions"][0]["markPrice"], 1.0);
}

#[tokio::test]
async fn test_resolve_without_winner() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;
    trade(&router, market, user, "no", "buy", 4).await;

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/markets/{}/resolve", market),
        Some(json!({"outcome": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["market"]["resolution"].is_null());
    assert!(body["payouts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_candles_after_tick() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;
    trade(&router, market, user, "yes", "buy", 10).await;

    app.aggregator.run_tick().await.unwrap();

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/markets/{}/candles?tf=5s", market),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeframe"], "5s");
    let candles = body["candles"].as_array().unwrap();
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0]["timestamp"], T0);
    let close = candles[0]["close"].as_f64().unwrap();
    assert!((close - 0.622459).abs() < 1e-5);

    // Default timeframe is the base one
    let (_, default_tf) = send(
        &router,
        "GET",
        &format!("/api/markets/{}/candles", market),
        None,
    )
    .await;
    assert_eq!(default_tf["timeframe"], "5s");

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/markets/{}/candles?tf=2m", market),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, _) = send(&router, "GET", "/api/markets/42/candles?tf=1m", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_views() {
    let app = create_app();
    let router = app.router();
    let (market, user) = setup(&router).await;
    trade(&router, market, user, "yes", "buy", 10).await;
    trade(&router, market, user, "yes", "sell", 4).await;

    let (status, view) = send(&router, "GET", &format!("/api/users/{}", user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["name"], "alice");
    assert_eq!(view["isBot"], false);
    let positions = view["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["outcome"], "yes");
    assert_eq!(positions[0]["totalShares"], 6);

    let (status, history) = send(
        &router,
        "GET",
        &format!("/api/users/{}/trades", user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    // Newest first
    assert_eq!(history[0]["action"], "sell");
    assert_eq!(history[0]["shares"], 4);
    assert!(history[0]["price"].as_f64().unwrap() > 0.0);
    assert_eq!(history[1]["action"], "buy");

    let (status, _) = send(&router, "GET", "/api/users/77/trades", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_validation_and_balance() {
    let app = create_app();
    let router = app.router();
    let (_, user) = setup(&router).await;

    let (status, _) = send(&router, "POST", "/admin/markets", Some(json!({"title": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "POST",
        "/admin/users",
        Some(json!({"name": "bob", "balance": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, bob) = send(&router, "POST", "/admin/users", Some(json!({"name": "bob"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bob["balance"], 1000.0);

    let (status, body) = send(
        &router,
        "POST",
        &format!("/admin/users/{}/balance", user),
        Some(json!({"balance": 250})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 250.0);

    let (status, _) = send(
        &router,
        "POST",
        "/admin/users/404/balance",
        Some(json!({"balance": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bot_swarm_control() {
    let app = create_app();
    let router = app.router();
    setup(&router).await;

    let (status, body) = send(&router, "GET", "/admin/bots/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);

    let (status, body) = send(&router, "POST", "/admin/bots/start", Some(json!({"count": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], true);
    assert_eq!(body["botCount"], 3);

    let (status, _) = send(&router, "POST", "/admin/bots/start", Some(json!({"count": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, "POST", "/admin/bots/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
}
