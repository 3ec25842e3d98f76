//! Backend Adapter Tests - Wire Format, Retries and Error Bodies
//!
//! Runs the real `BackendClient` + `BackendAdapter` against a fake
//! analytics backend served by axum on an ephemeral port.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use trade_history_tracker::adapters::api::{BackendAdapter, BackendClient, BackendClientConfig};
use trade_history_tracker::domain::history::{Market, PositionSide, TradeInput};
use trade_history_tracker::ports::analysis::AnalysisService;
use trade_history_tracker::ports::status::{StatusQuery, TradeStatusSource};

#[derive(Clone, Default)]
struct FakeBackend {
    status_calls: Arc<AtomicUsize>,
    analyze_calls: Arc<AtomicUsize>,
}

async fn check_status(State(fake): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    // First call fails transiently.
    if fake.status_calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    assert_eq!(body["coin"], "BTCUSDT");
    assert_eq!(body["entryPrice"], 100.0);
    assert_eq!(body["targets"], json!([102.0]));
    assert_eq!(body["userStoploss"], 97.0);
    Json(json!({"currentPrice": "105", "tgtHit": true, "slHit": false})).into_response()
}

async fn analyze(State(fake): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    fake.analyze_calls.fetch_add(1, Ordering::SeqCst);
    match body["coin"].as_str() {
        Some("BADUSDT") => Json(json!({"error": "unsupported symbol"})).into_response(),
        Some("NOPEUSDT") => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "quantity too small"})),
        )
            .into_response(),
        _ => {
            assert_eq!(body["position_type"], "Long");
            assert_eq!(body["entry_price"], 100.0);
            Json(json!({
                "coin": body["coin"],
                "current_price": 100.5,
                "targets": [102.0, 104.0],
                "user_stoploss": 97.0,
                "market_stoplosses": [96.0],
                "patterns": ["cup and handle"],
            }))
            .into_response()
        }
    }
}

async fn spawn_backend() -> (FakeBackend, BackendAdapter, Arc<BackendClient>) {
    let fake = FakeBackend::default();
    let app = Router::new()
        .route("/api/checkTradeStatus", post(check_status))
        .route("/analyze", post(analyze))
        .route(
            "/premium/patterns",
            get(|| async { Json(json!({"BTCUSDT": ["bull flag"]})) }),
        )
        .route(
            "/premium/bias",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = Arc::new(
        BackendClient::new(BackendClientConfig {
            base_url: format!("http://{addr}/"),
            timeout: Duration::from_secs(5),
            max_concurrent: 4,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(10),
            api_token: Some("test-token".to_string()),
        })
        .unwrap(),
    );
    (fake, BackendAdapter::new(Arc::clone(&client)), client)
}

fn trade(coin: &str) -> TradeInput {
    TradeInput {
        coin: coin.to_string(),
        market: Market::Spot,
        position_type: PositionSide::Long,
        entry_price: 100.0,
        quantity: 1.0,
        timeframe: "4h".to_string(),
    }
}

#[tokio::test]
async fn test_client_strips_trailing_slash() {
    let (_fake, adapter, client) = spawn_backend().await;
    assert!(!client.base_url().ends_with('/'));
    assert!(adapter.premium_patterns().await.is_ok());
}

#[tokio::test]
async fn test_status_check_retries_then_parses_lenient_response() {
    let (fake, adapter, _client) = spawn_backend().await;

    let update = adapter
        .check_status(&StatusQuery {
            coin: "BTCUSDT".to_string(),
            entry_price: 100.0,
            targets: vec![102.0],
            user_stoploss: Some(97.0),
            market_stoplosses: vec![],
        })
        .await
        .unwrap();

    assert_eq!(fake.status_calls.load(Ordering::SeqCst), 2);
    assert_eq!(update.current_price, Some(105.0));
    assert!(update.target_hit);
    assert!(!update.stop_loss_hit);
}

#[tokio::test]
async fn test_analyze_sends_snake_case_and_keeps_extra_fields() {
    let (_fake, adapter, _client) = spawn_backend().await;

    let result = adapter.analyze(&trade("ETHUSDT")).await.unwrap();
    assert_eq!(result.coin.as_deref(), Some("ETHUSDT"));
    assert_eq!(result.current_price, Some(100.5));
    assert_eq!(result.targets, vec![102.0, 104.0]);
    assert_eq!(result.distinct_stoplosses(), vec![97.0, 96.0]);
    assert_eq!(result.extra["patterns"], json!(["cup and handle"]));
}

#[tokio::test]
async fn test_analyze_error_body_is_rejected() {
    let (_fake, adapter, _client) = spawn_backend().await;

    let err = adapter.analyze(&trade("BADUSDT")).await.unwrap_err();
    assert!(format!("{err:#}").contains("unsupported symbol"));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (fake, adapter, _client) = spawn_backend().await;

    let err = adapter.analyze(&trade("NOPEUSDT")).await.unwrap_err();
    assert!(format!("{err:#}").contains("422"));
    assert_eq!(fake.analyze_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_premium_feeds() {
    let (_fake, adapter, _client) = spawn_backend().await;

    let patterns = adapter.premium_patterns().await.unwrap();
    assert_eq!(patterns["BTCUSDT"][0], "bull flag");

    // 5xx exhausts retries and surfaces as an error.
    assert!(adapter.premium_bias().await.is_err());
}
