//! Status Reconciler - Poll-and-Patch of Pending Entries
//!
//! For every pending history entry, asks the backend whether a target
//! or stop-loss has been hit and writes the answer back into the store.
//!
//! Cycle flow:
//! 1. Snapshot pending entries (resolved ones are never queried again)
//! 2. Fire one status request per entry, bounded by `max_in_flight`
//! 3. Patch each entry as its response lands, persisting immediately
//! 4. Log and count per-entry failures; siblings carry on

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::history::ApplyOutcome;
use crate::ports::status::{StatusQuery, TradeStatusSource};

use super::history_store::HistoryStore;

/// Outcome counters for one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
  /// Status requests issued.
  pub checked: usize,
  /// Entries whose price was refreshed but stay pending.
  pub updated: usize,
  /// Entries that turned resolved this cycle.
  pub resolved: usize,
  /// Responses without a price, or for entries gone meanwhile.
  pub unchanged: usize,
  /// Requests that failed.
  pub failed: usize,
  /// Cycle not run because another one was in progress.
  pub skipped: bool,
}

impl CycleReport {
  fn skipped() -> Self {
    Self {
      skipped: true,
      ..Self::default()
    }
  }
}

/// Reconciles pending history entries against the status endpoint.
pub struct StatusReconciler {
  store: Arc<HistoryStore>,
  source: Arc<dyn TradeStatusSource>,
  /// Maximum concurrent status requests per cycle.
  max_in_flight: usize,
  /// Held for the duration of a cycle; overlapping calls are skipped.
  running: Mutex<()>,
}

impl StatusReconciler {
  /// Create a new reconciler.
  pub fn new(
    store: Arc<HistoryStore>,
    source: Arc<dyn TradeStatusSource>,
    max_in_flight: usize,
  ) -> Self {
    Self {
      store,
      source,
      max_in_flight: max_in_flight.max(1),
      running: Mutex::new(()),
    }
  }

  /// Run one reconciliation cycle.
  ///
  /// Never fails: request errors are logged per entry and reflected in
  /// the report. Calling this while a cycle is already running returns
  /// a skipped report instead of starting a second one.
  #[instrument(skip(self))]
  pub async fn run_cycle(&self) -> CycleReport {
    let Ok(_guard) = self.running.try_lock() else {
      info!("Reconciliation already running, skipping cycle");
      return CycleReport::skipped();
    };

    let pending = self.store.pending().await;
    if pending.is_empty() {
      debug!("No pending entries to reconcile");
      return CycleReport::default();
    }

    info!(pending = pending.len(), "Starting reconciliation cycle");

    let source = Arc::clone(&self.source);
    let mut responses = stream::iter(pending)
      .map(|entry| {
        let source = Arc::clone(&source);
        async move {
          let query = StatusQuery::from(&entry);
          let result = source.check_status(&query).await;
          (entry.timestamp, query.coin, result)
        }
      })
      .buffer_unordered(self.max_in_flight);

    let mut report = CycleReport::default();

    while let Some((timestamp, coin, result)) = responses.next().await {
      report.checked += 1;

      let update = match result {
        Ok(update) => update,
        Err(e) => {
          warn!(timestamp, coin = %coin, error = %e, "Status check failed");
          report.failed += 1;
          continue;
        }
      };

      match self.store.apply_status(timestamp, &update).await {
        ApplyOutcome::Resolved => report.resolved += 1,
        ApplyOutcome::PriceUpdated => report.updated += 1,
        ApplyOutcome::Unchanged | ApplyOutcome::NotFound | ApplyOutcome::Ignored => {
          report.unchanged += 1;
        }
      }
    }

    info!(
      checked = report.checked,
      updated = report.updated,
      resolved = report.resolved,
      unchanged = report.unchanged,
      failed = report.failed,
      "Reconciliation cycle complete"
    );

    report
  }
}
