//! API Server - History Endpoints and Health Checks
//!
//! Routes:
//! - `GET    /live`               200 while the process runs
//! - `GET    /ready`              200 if history storage is usable
//! - `GET    /history`            full view, newest first (`?limit=`)
//! - `GET    /history/recent`     compact view (`?limit=`)
//! - `GET    /history/summary`    hit counters
//! - `GET    /history/panel`      last published compact snapshot
//! - `DELETE /history`            clear all history
//! - `POST   /history/reconcile`  run a reconciliation cycle now
//! - `POST   /analyze`            analyze and record a trade
//! - `GET    /highlights`         cached premium feeds

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::history::{EntryStatus, HistoryEntry, TradeInput};
use crate::usecases::analysis::{AnalyzeAndRecord, SubmitError};
use crate::usecases::highlights::HighlightCache;
use crate::usecases::history_store::HistoryStore;
use crate::usecases::recent_view::RecentFeed;
use crate::usecases::reconciler::StatusReconciler;

/// Shared handles for all routes.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<HistoryStore>,
    pub reconciler: Arc<StatusReconciler>,
    pub analyzer: Arc<AnalyzeAndRecord>,
    pub highlights: Arc<HighlightCache>,
    pub recent: Arc<RecentFeed>,
    pub metrics: Option<Arc<MetricsRegistry>>,
    /// Default size of the compact view.
    pub recent_limit: usize,
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

/// History entry plus the values a view derives from it.
#[derive(Debug, Serialize)]
struct HistoryItem {
    #[serde(flatten)]
    entry: HistoryEntry,
    status: EntryStatus,
    distinct_targets: Vec<f64>,
    distinct_stoplosses: Vec<f64>,
    unrealized_pnl: Option<f64>,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            status: entry.status(),
            distinct_targets: entry.result.distinct_targets(),
            distinct_stoplosses: entry.result.distinct_stoplosses(),
            unrealized_pnl: entry.unrealized_pnl(),
            entry,
        }
    }
}

fn items(entries: Vec<HistoryEntry>) -> Json<Vec<HistoryItem>> {
    Json(entries.into_iter().map(HistoryItem::from).collect())
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Build the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/history", get(full_history).delete(clear_history))
        .route("/history/recent", get(recent_history))
        .route("/history/summary", get(summary))
        .route("/history/panel", get(panel))
        .route("/history/reconcile", post(reconcile_now))
        .route("/analyze", post(analyze))
        .route("/highlights", get(highlights))
        .with_state(state)
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness(State(state): State<ApiState>) -> impl IntoResponse {
    if state.store.is_healthy().await {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn full_history(
    State(state): State<ApiState>,
    Query(params): Query<LimitParams>,
) -> impl IntoResponse {
    items(state.store.load(params.limit).await)
}

async fn recent_history(
    State(state): State<ApiState>,
    Query(params): Query<LimitParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(state.recent_limit);
    items(state.store.recent(limit).await)
}

async fn summary(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.store.summary().await)
}

async fn panel(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.recent.latest())
}

async fn clear_history(State(state): State<ApiState>) -> impl IntoResponse {
    state.store.clear().await;
    if let Some(metrics) = &state.metrics {
        metrics.observe_summary(&state.store.summary().await);
    }
    StatusCode::NO_CONTENT
}

async fn reconcile_now(State(state): State<ApiState>) -> impl IntoResponse {
    let report = state.reconciler.run_cycle().await;
    if let Some(metrics) = &state.metrics {
        metrics.record_cycle(&report);
        metrics.observe_summary(&state.store.summary().await);
    }
    Json(report)
}

async fn analyze(State(state): State<ApiState>, Json(input): Json<TradeInput>) -> Response {
    match state.analyzer.submit(input).await {
        Ok(entry) => {
            if let Some(metrics) = &state.metrics {
                metrics.entries_appended.inc();
                metrics.observe_summary(&state.store.summary().await);
            }
            (StatusCode::CREATED, Json(HistoryItem::from(entry))).into_response()
        }
        Err(e @ SubmitError::Invalid(_)) => error_body(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e @ SubmitError::Backend(_)) => error_body(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

async fn highlights(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.highlights.snapshot().await)
}

/// Axum server for the local API.
pub struct ApiServer {
    state: ApiState,
    bind_address: String,
}

impl ApiServer {
    pub fn new(state: ApiState, bind_address: String) -> Self {
        Self {
            state,
            bind_address,
        }
    }

    /// Serve until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        info!("API server started");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
