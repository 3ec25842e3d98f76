//! Prometheus Metrics Registry - Tracker Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards:
//! reconciliation outcomes, stored / pending history size and hit
//! counters.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::summary::HitSummary;
use crate::usecases::reconciler::CycleReport;

/// Centralized Prometheus metrics for the tracker.
///
/// All metrics follow the naming convention `trade_history_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Reconciliation cycles by result (`run`, `skipped`).
    pub cycles: IntCounterVec,
    /// Status checks by outcome (`resolved`, `updated`, `unchanged`, `failed`).
    pub status_checks: IntCounterVec,
    /// Entries appended through the analyze endpoint.
    pub entries_appended: IntCounter,
    /// Entries currently stored.
    pub stored_entries: IntGauge,
    /// Entries still pending.
    pub pending_entries: IntGauge,
    /// Entries with a target hit.
    pub targets_hit: IntGauge,
    /// Entries with a stop-loss hit.
    pub stop_losses_hit: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("trade_history_reconcile_cycles_total", "Reconciliation cycles"),
            &["result"],
        )?;

        let status_checks = IntCounterVec::new(
            Opts::new(
                "trade_history_status_checks_total",
                "Trade status checks by outcome",
            ),
            &["outcome"],
        )?;

        let entries_appended = IntCounter::new(
            "trade_history_entries_appended_total",
            "History entries recorded",
        )?;

        let stored_entries =
            IntGauge::new("trade_history_stored_entries", "Entries currently stored")?;
        let pending_entries =
            IntGauge::new("trade_history_pending_entries", "Entries awaiting a hit")?;
        let targets_hit =
            IntGauge::new("trade_history_targets_hit", "Stored entries with a target hit")?;
        let stop_losses_hit = IntGauge::new(
            "trade_history_stop_losses_hit",
            "Stored entries with a stop-loss hit",
        )?;

        // Register all metrics
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(status_checks.clone()))?;
        registry.register(Box::new(entries_appended.clone()))?;
        registry.register(Box::new(stored_entries.clone()))?;
        registry.register(Box::new(pending_entries.clone()))?;
        registry.register(Box::new(targets_hit.clone()))?;
        registry.register(Box::new(stop_losses_hit.clone()))?;

        Ok(Self {
            registry,
            cycles,
            status_checks,
            entries_appended,
            stored_entries,
            pending_entries,
            targets_hit,
            stop_losses_hit,
        })
    }

    /// Fold a cycle report into the counters.
    pub fn record_cycle(&self, report: &CycleReport) {
        if report.skipped {
            self.cycles.with_label_values(&["skipped"]).inc();
            return;
        }
        self.cycles.with_label_values(&["run"]).inc();

        let outcomes = [
            ("resolved", report.resolved),
            ("updated", report.updated),
            ("unchanged", report.unchanged),
            ("failed", report.failed),
        ];
        for (label, count) in outcomes {
            self.status_checks
                .with_label_values(&[label])
                .inc_by(count as u64);
        }
    }

    /// Mirror the current hit summary into the gauges.
    pub fn observe_summary(&self, summary: &HitSummary) {
        let gauge = |g: &IntGauge, v: usize| g.set(i64::try_from(v).unwrap_or(i64::MAX));
        gauge(&self.stored_entries, summary.total);
        gauge(&self.pending_entries, summary.pending);
        gauge(&self.targets_hit, summary.targets_hit);
        gauge(&self.stop_losses_hit, summary.stop_losses_hit);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
