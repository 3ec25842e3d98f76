//! Trade History Tracker - Entry Point
//!
//! Initializes configuration, logging, history storage and the
//! backend client, then runs the periodic jobs and the local API
//! until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (+ BACKEND_* env overrides) and validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open the history store on file or memory storage
//! 4. Create BackendClient + BackendAdapter (status + analysis ports)
//! 5. Build reconciler, recent feed, highlight cache, analyze use case
//! 6. Spawn periodic jobs: reconcile (5 min), recent view (30 s), highlights
//! 7. Spawn API server and metrics server
//! 8. Wait for SIGINT → stop jobs → stop servers → exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use trade_history_tracker::adapters::api::{BackendAdapter, BackendClient, BackendClientConfig};
use trade_history_tracker::adapters::http::{ApiServer, ApiState};
use trade_history_tracker::adapters::metrics::MetricsRegistry;
use trade_history_tracker::adapters::persistence::{FileStorage, MemoryStorage};
use trade_history_tracker::config::{self, AppConfig, StorageKind};
use trade_history_tracker::ports::storage::KeyValueStorage;
use trade_history_tracker::usecases::{
    AnalyzeAndRecord, HighlightCache, HistoryStore, RecentFeed, Scheduler, StatusReconciler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend.base_url,
        storage = ?config.history.storage,
        "Starting trade history tracker"
    );

    // ── 3. History store ────────────────────────────────────
    let storage = open_storage(&config).await?;
    let store = Arc::new(
        HistoryStore::open(
            storage,
            config.history.storage_key.clone(),
            config.history.retention_policy(),
        )
        .await,
    );

    // ── 4. Backend client and port adapter ──────────────────
    let client = Arc::new(
        BackendClient::new(BackendClientConfig {
            base_url: config.backend.base_url.clone(),
            timeout: Duration::from_secs(config.backend.timeout_seconds),
            max_concurrent: config.backend.max_concurrent,
            max_retries: config.backend.max_retries,
            retry_base_delay: Duration::from_millis(config.backend.retry_base_delay_ms),
            api_token: config.backend.api_token.clone(),
        })
        .context("Failed to create backend client")?,
    );
    info!(base_url = %client.base_url(), "Backend client ready");
    let backend = Arc::new(BackendAdapter::new(client));

    // ── 5. Use cases ────────────────────────────────────────
    let reconciler = Arc::new(StatusReconciler::new(
        Arc::clone(&store),
        backend.clone(),
        config.schedule.max_in_flight,
    ));
    let recent = Arc::new(RecentFeed::new(Arc::clone(&store), config.history.recent_limit));
    let highlights = Arc::new(HighlightCache::new(backend.clone()));
    let analyzer = Arc::new(AnalyzeAndRecord::new(backend, Arc::clone(&store)));

    let metrics = if config.metrics.enabled {
        Some(Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?))
    } else {
        None
    };

    // ── 6. Periodic jobs ────────────────────────────────────
    let mut scheduler = Scheduler::new();
    {
        let reconciler = Arc::clone(&reconciler);
        let store = Arc::clone(&store);
        let metrics = metrics.clone();
        scheduler.spawn_periodic(
            "reconcile",
            Duration::from_secs(config.schedule.reconcile_interval_seconds),
            move || {
                let reconciler = Arc::clone(&reconciler);
                let store = Arc::clone(&store);
                let metrics = metrics.clone();
                async move {
                    let report = reconciler.run_cycle().await;
                    if let Some(metrics) = metrics {
                        metrics.record_cycle(&report);
                        metrics.observe_summary(&store.summary().await);
                    }
                }
            },
        );
    }
    {
        let recent = Arc::clone(&recent);
        scheduler.spawn_periodic(
            "recent_view",
            Duration::from_secs(config.schedule.recent_refresh_seconds),
            move || {
                let recent = Arc::clone(&recent);
                async move { recent.refresh().await }
            },
        );
    }
    if config.schedule.highlights_refresh_seconds > 0 {
        let highlights = Arc::clone(&highlights);
        scheduler.spawn_periodic(
            "highlights",
            Duration::from_secs(config.schedule.highlights_refresh_seconds),
            move || {
                let highlights = Arc::clone(&highlights);
                async move { highlights.refresh().await }
            },
        );
    }

    // ── 7. Servers ──────────────────────────────────────────
    let mut servers = Vec::new();

    if let Some(metrics) = &metrics {
        let shutdown_rx = scheduler.subscribe_shutdown();
        let metrics = Arc::clone(metrics);
        let bind = config.metrics.bind_address.clone();
        servers.push(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind, shutdown_rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }));
    }

    if config.server.enabled {
        let state = ApiState {
            store: Arc::clone(&store),
            reconciler: Arc::clone(&reconciler),
            analyzer,
            highlights,
            recent,
            metrics: metrics.clone(),
            recent_limit: config.history.recent_limit,
        };
        let server = ApiServer::new(state, config.server.bind_address.clone());
        let shutdown_rx = scheduler.subscribe_shutdown();
        servers.push(tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!(error = %e, "API server failed");
            }
        }));
    }

    info!(jobs = scheduler.job_count(), servers = servers.len(), "Tracker is running");

    // ── 8. Wait for SIGINT, then shut down ──────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    scheduler.shutdown(Duration::from_secs(10)).await;

    for handle in servers {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!(summary = ?store.summary().await, "Shutdown complete");
    Ok(())
}

/// Build the storage backend named in config.
async fn open_storage(config: &AppConfig) -> Result<Arc<dyn KeyValueStorage>> {
    Ok(match config.history.storage {
        StorageKind::File => Arc::new(
            FileStorage::new(&config.history.data_dir)
                .await
                .context("Failed to open history storage")?,
        ),
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    })
}
