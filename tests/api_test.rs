//! HTTP API Tests - Local History Endpoints
//!
//! Serves the router on an ephemeral port and drives it with reqwest,
//! with a scripted backend standing in for the analysis service.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use trade_history_tracker::adapters::http::{ApiState, router};
use trade_history_tracker::adapters::metrics::MetricsRegistry;
use trade_history_tracker::adapters::persistence::MemoryStorage;
use trade_history_tracker::domain::history::{AnalysisResult, StatusUpdate, TradeInput};
use trade_history_tracker::domain::retention::RetentionPolicy;
use trade_history_tracker::ports::analysis::AnalysisService;
use trade_history_tracker::ports::status::{StatusQuery, TradeStatusSource};
use trade_history_tracker::usecases::{
    AnalyzeAndRecord, HighlightCache, HistoryStore, RecentFeed, StatusReconciler,
};

/// Backend that analyzes everything except `FAILUSDT` and reports every
/// position as having hit its first target.
struct ScriptedBackend;

#[async_trait::async_trait]
impl AnalysisService for ScriptedBackend {
    async fn analyze(&self, input: &TradeInput) -> anyhow::Result<AnalysisResult> {
        if input.coin == "FAILUSDT" {
            anyhow::bail!("backend returned 500");
        }
        Ok(serde_json::from_value(json!({
            "coin": input.coin,
            "current_price": input.entry_price,
            "targets": [input.entry_price * 1.02, input.entry_price * 1.02],
            "user_stoploss": input.entry_price * 0.97,
            "market_stoplosses": [input.entry_price * 0.97, input.entry_price * 0.95],
            "sentiment": "bullish",
        }))?)
    }

    async fn premium_patterns(&self) -> anyhow::Result<Value> {
        Ok(json!([{"coin": "BTCUSDT", "pattern": "bull flag"}]))
    }

    async fn premium_bias(&self) -> anyhow::Result<Value> {
        anyhow::bail!("premium bias unavailable")
    }
}

#[async_trait::async_trait]
impl TradeStatusSource for ScriptedBackend {
    async fn check_status(&self, query: &StatusQuery) -> anyhow::Result<StatusUpdate> {
        Ok(StatusUpdate {
            current_price: query.targets.first().copied(),
            target_hit: true,
            stop_loss_hit: false,
        })
    }
}

struct TestApi {
    base: String,
    client: reqwest::Client,
    store: Arc<HistoryStore>,
    highlights: Arc<HighlightCache>,
    recent: Arc<RecentFeed>,
    metrics: Arc<MetricsRegistry>,
}

async fn spawn_api() -> TestApi {
    let store = Arc::new(
        HistoryStore::open(
            Arc::new(MemoryStorage::new()),
            "tradeHistory",
            RetentionPolicy::default(),
        )
        .await,
    );
    let backend = Arc::new(ScriptedBackend);
    let highlights = Arc::new(HighlightCache::new(backend.clone()));
    let recent = Arc::new(RecentFeed::new(Arc::clone(&store), 2));
    let metrics = Arc::new(MetricsRegistry::new().unwrap());

    let state = ApiState {
        store: Arc::clone(&store),
        reconciler: Arc::new(StatusReconciler::new(Arc::clone(&store), backend.clone(), 4)),
        analyzer: Arc::new(AnalyzeAndRecord::new(backend, Arc::clone(&store))),
        highlights: Arc::clone(&highlights),
        recent: Arc::clone(&recent),
        metrics: Some(Arc::clone(&metrics)),
        recent_limit: 2,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestApi {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        highlights,
        recent,
        metrics,
    }
}

fn trade(coin: &str) -> Value {
    json!({
        "coin": coin,
        "market": "futures",
        "positionType": "Long",
        "entryPrice": 100,
        "quantity": 2,
        "timeframe": "1h",
    })
}

impl TestApi {
    async fn get_json(&self, path: &str) -> Value {
        let resp = self.client.get(format!("{}{path}", self.base)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.json().await.unwrap()
    }

    async fn analyze(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/analyze", self.base))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let api = spawn_api().await;
    let live = api.client.get(format!("{}/live", api.base)).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    let ready = api.client.get(format!("{}/ready", api.base)).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analyze_records_and_lists_newest_first() {
    let api = spawn_api().await;

    let resp = api.analyze(trade("ethusdt")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["input"]["coin"], "ETHUSDT");
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["distinct_targets"].as_array().unwrap().len(), 1);
    assert_eq!(created["distinct_stoplosses"].as_array().unwrap().len(), 2);
    assert_eq!(created["result"]["sentiment"], "bullish");

    api.analyze(trade("BTCUSDT")).await;

    let history = api.get_json("/history").await;
    let coins: Vec<_> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["input"]["coin"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(coins, vec!["BTCUSDT", "ETHUSDT"]);

    let limited = api.get_json("/history?limit=1").await;
    assert_eq!(limited.as_array().unwrap().len(), 1);

    assert_eq!(api.metrics.entries_appended.get(), 2);
}

#[tokio::test]
async fn test_analyze_rejects_invalid_input() {
    let api = spawn_api().await;

    let mut body = trade("BTCUSDT");
    body["entryPrice"] = json!(0);
    let resp = api.analyze(body).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = resp.json().await.unwrap();
    assert!(err["error"].as_str().unwrap().contains("entry price"));

    assert!(api.store.entries().await.is_empty());
}

#[tokio::test]
async fn test_analyze_backend_failure_is_bad_gateway() {
    let api = spawn_api().await;

    let resp = api.analyze(trade("FAILUSDT")).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(api.store.entries().await.is_empty());
}

#[tokio::test]
async fn test_recent_view_uses_default_limit() {
    let api = spawn_api().await;
    for coin in ["AUSDT", "BUSDT", "CUSDT"] {
        api.analyze(trade(coin)).await;
    }

    let recent = api.get_json("/history/recent").await;
    assert_eq!(recent.as_array().unwrap().len(), 2);
    assert_eq!(recent[0]["input"]["coin"], "CUSDT");

    let recent = api.get_json("/history/recent?limit=3").await;
    assert_eq!(recent.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_reconcile_then_summary() {
    let api = spawn_api().await;
    api.analyze(trade("BTCUSDT")).await;

    let summary = api.get_json("/history/summary").await;
    assert_eq!(summary["targets_hit"], 0);
    assert_eq!(summary["pending"], 1);

    let resp = api
        .client
        .post(format!("{}/history/reconcile", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["resolved"], 1);

    let summary = api.get_json("/history/summary").await;
    assert_eq!(summary["targets_hit"], 1);
    assert_eq!(summary["stop_losses_hit"], 0);
    assert_eq!(summary["pending"], 0);

    let history = api.get_json("/history").await;
    assert_eq!(history[0]["status"], "Resolved");
    assert_eq!(history[0]["result"]["targetHit"], true);
    assert_eq!(history[0]["result"]["current_price"], json!(102.0));
    assert!((history[0]["unrealized_pnl"].as_f64().unwrap() - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_clear_history() {
    let api = spawn_api().await;
    api.analyze(trade("BTCUSDT")).await;

    let resp = api
        .client
        .delete(format!("{}/history", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let history = api.get_json("/history").await;
    assert!(history.as_array().unwrap().is_empty());
    assert_eq!(api.metrics.stored_entries.get(), 0);
}

#[tokio::test]
async fn test_highlights_keep_successful_feed_only() {
    let api = spawn_api().await;

    let empty = api.get_json("/highlights").await;
    assert!(empty["patterns"].is_null());

    api.highlights.refresh().await;
    let highlights = api.get_json("/highlights").await;
    assert_eq!(highlights["patterns"]["data"][0]["pattern"], "bull flag");
    assert!(highlights["bias"].is_null());
}

#[tokio::test]
async fn test_panel_shows_last_published_snapshot() {
    let api = spawn_api().await;
    api.analyze(trade("BTCUSDT")).await;

    // Nothing published until the feed refreshes.
    let panel = api.get_json("/history/panel").await;
    assert!(panel["entries"].as_array().unwrap().is_empty());

    api.recent.refresh().await;
    let panel = api.get_json("/history/panel").await;
    assert_eq!(panel["entries"][0]["input"]["coin"], "BTCUSDT");
    assert_eq!(panel["summary"]["pending"], 1);
}
