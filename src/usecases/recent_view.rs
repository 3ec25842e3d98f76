//! Recent Feed - Read-Only Compact History Snapshot
//!
//! Re-reads the newest few entries and the hit counters on a short
//! period and publishes them on a watch channel. Never writes storage
//! and never reconciles; freshness of display only.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::history::HistoryEntry;
use crate::domain::summary::HitSummary;

use super::history_store::HistoryStore;

/// Default number of entries in the compact view.
pub const DEFAULT_RECENT_LIMIT: usize = 2;

/// What the compact panel shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecentSnapshot {
  pub entries: Vec<HistoryEntry>,
  pub summary: HitSummary,
  /// When this snapshot was taken (Unix ms).
  pub refreshed_at: i64,
}

/// Publishes `RecentSnapshot`s for the compact panel.
pub struct RecentFeed {
  store: Arc<HistoryStore>,
  limit: usize,
  tx: watch::Sender<RecentSnapshot>,
}

impl RecentFeed {
  pub fn new(store: Arc<HistoryStore>, limit: usize) -> Self {
    let (tx, _) = watch::channel(RecentSnapshot::default());
    Self { store, limit, tx }
  }

  pub fn subscribe(&self) -> watch::Receiver<RecentSnapshot> {
    self.tx.subscribe()
  }

  /// Latest published snapshot.
  pub fn latest(&self) -> RecentSnapshot {
    self.tx.borrow().clone()
  }

  /// Re-read the store and publish if anything changed.
  pub async fn refresh(&self) {
    let entries = self.store.recent(self.limit).await;
    let summary = self.store.summary().await;

    let changed = self.tx.send_if_modified(|current| {
      let changed = current.entries != entries || current.summary != summary;
      current.refreshed_at = crate::domain::now_ms();
      if changed {
        current.entries = entries;
        current.summary = summary;
      }
      changed
    });

    debug!(changed, limit = self.limit, "Recent feed refreshed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::persistence::MemoryStorage;
  use crate::domain::history::{AnalysisResult, Market, PositionSide, TradeInput};
  use crate::domain::retention::RetentionPolicy;

  #[tokio::test]
  async fn test_refresh_publishes_newest_entries() {
    let store = Arc::new(
      HistoryStore::open(Arc::new(MemoryStorage::new()), "recent", RetentionPolicy::default())
        .await,
    );
    let feed = RecentFeed::new(Arc::clone(&store), DEFAULT_RECENT_LIMIT);
    let mut rx = feed.subscribe();

    for coin in ["BTCUSDT", "ETHUSDT", "SOLUSDT"] {
      let input = TradeInput {
        coin: coin.to_string(),
        market: Market::Spot,
        position_type: PositionSide::Long,
        entry_price: 1.0,
        quantity: 1.0,
        timeframe: "5m".to_string(),
      };
      store.append(input, AnalysisResult::default()).await;
    }

    feed.refresh().await;
    assert!(rx.has_changed().unwrap());

    let snapshot = rx.borrow_and_update().clone();
    let coins: Vec<_> = snapshot.entries.iter().map(|e| e.input.coin.as_str()).collect();
    assert_eq!(coins, vec!["SOLUSDT", "ETHUSDT"]);
    assert_eq!(snapshot.summary.total, 3);

    feed.refresh().await;
    assert!(!rx.has_changed().unwrap());
  }
}
