//! History Store - Bounded, Time-Windowed Trade History
//!
//! Owns the in-memory history sequence and its persisted copy in one
//! key-value slot. The sequence is newest-first; every write applies
//! the retention policy and rewrites the whole slot.
//!
//! Failure policy: storage problems never reach the caller. A failed
//! read is an empty history, a failed write is logged and the
//! in-memory state carries on. Analysis must keep working even when
//! history can't be saved.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::domain::history::{AnalysisResult, ApplyOutcome, HistoryEntry, StatusUpdate, TradeInput};
use crate::domain::retention::RetentionPolicy;
use crate::domain::summary::HitSummary;
use crate::ports::storage::KeyValueStorage;

/// Storage key the history has always been saved under.
pub const DEFAULT_STORAGE_KEY: &str = "tradeHistory";

/// Source of "now" in Unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Explicit, injectable history store.
pub struct HistoryStore {
  storage: Arc<dyn KeyValueStorage>,
  key: String,
  policy: RetentionPolicy,
  clock: Clock,
  /// Newest-first sequence. Held across storage writes so in-process
  /// read-modify-write cycles never interleave.
  entries: Mutex<Vec<HistoryEntry>>,
  /// Bumped on every in-memory change so views can re-render.
  revision: watch::Sender<u64>,
}

impl HistoryStore {
  /// Open the store and load whatever history survived.
  pub async fn open(
    storage: Arc<dyn KeyValueStorage>,
    key: impl Into<String>,
    policy: RetentionPolicy,
  ) -> Self {
    Self::open_with_clock(storage, key, policy, Arc::new(crate::domain::now_ms)).await
  }

  /// Open with an explicit clock (tests, replay).
  pub async fn open_with_clock(
    storage: Arc<dyn KeyValueStorage>,
    key: impl Into<String>,
    policy: RetentionPolicy,
    clock: Clock,
  ) -> Self {
    let (revision, _) = watch::channel(0);
    let store = Self {
      storage,
      key: key.into(),
      policy,
      clock,
      entries: Mutex::new(Vec::new()),
      revision,
    };

    let loaded = store.read_persisted().await.unwrap_or_default();
    let loaded = store.policy.apply(loaded, store.now());
    info!(key = %store.key, entries = loaded.len(), "History store opened");
    *store.entries.lock().await = loaded;

    store
  }

  fn now(&self) -> i64 {
    (self.clock)()
  }

  /// Record a new analysis at the front of the history.
  ///
  /// Timestamps are kept strictly decreasing along the sequence so they
  /// stay usable as identities even for same-millisecond submissions.
  #[instrument(skip(self, input, result), fields(coin = %input.coin))]
  pub async fn append(&self, input: TradeInput, result: AnalysisResult) -> HistoryEntry {
    let mut entries = self.entries.lock().await;

    let now = self.now();
    let timestamp = match entries.first() {
      Some(newest) if newest.timestamp >= now => newest.timestamp + 1,
      _ => now,
    };

    let entry = HistoryEntry::new(input, result, timestamp);
    entries.insert(0, entry.clone());
    self.commit(&mut entries).await;

    info!(timestamp, stored = entries.len(), "History entry appended");
    entry
  }

  /// Full history view: re-read storage, drop expired entries, newest
  /// first, at most `limit` entries.
  ///
  /// Reads never write back; expired entries leave storage at the next
  /// write. On a storage error the view is empty and the in-memory
  /// sequence is left alone.
  ///
  /// The lock is held across the re-read so a concurrent write can't
  /// land between the read and the in-memory refresh.
  #[instrument(skip(self))]
  pub async fn load(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
    let mut entries = self.entries.lock().await;
    let Some(persisted) = self.read_persisted().await else {
      return Vec::new();
    };

    let mut view = self.policy.apply(persisted, self.now());
    if *entries != view {
      *entries = view.clone();
      self.bump();
    }
    drop(entries);

    view.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = limit {
      view.truncate(limit);
    }
    view
  }

  /// Compact view: the first `n` live entries in stored order.
  pub async fn recent(&self, n: usize) -> Vec<HistoryEntry> {
    let now = self.now();
    self
      .entries
      .lock()
      .await
      .iter()
      .filter(|e| !self.policy.is_expired(e, now))
      .take(n)
      .cloned()
      .collect()
  }

  /// Drop all history, persisted and in memory.
  #[instrument(skip(self))]
  pub async fn clear(&self) {
    let mut entries = self.entries.lock().await;
    if let Err(e) = self.storage.remove(&self.key).await {
      warn!(key = %self.key, error = %e, "Failed to remove persisted history");
    }
    entries.clear();
    self.bump();
    info!("History cleared");
  }

  /// Snapshot of the in-memory sequence.
  pub async fn entries(&self) -> Vec<HistoryEntry> {
    self.entries.lock().await.clone()
  }

  /// Snapshot of live entries still waiting for a hit.
  pub async fn pending(&self) -> Vec<HistoryEntry> {
    let now = self.now();
    self
      .entries
      .lock()
      .await
      .iter()
      .filter(|e| !e.is_resolved() && !self.policy.is_expired(e, now))
      .cloned()
      .collect()
  }

  /// Patch one entry from a status response.
  ///
  /// The entry is looked up by timestamp at apply time, so responses
  /// landing in any order only ever touch their own entry. Any written
  /// change is persisted immediately.
  pub async fn apply_status(&self, timestamp: i64, update: &StatusUpdate) -> ApplyOutcome {
    let mut entries = self.entries.lock().await;

    let Some(entry) = entries.iter_mut().find(|e| e.timestamp == timestamp) else {
      debug!(timestamp, "Status for unknown entry dropped");
      return ApplyOutcome::NotFound;
    };

    let outcome = entry.apply_status(update);
    match outcome {
      ApplyOutcome::Resolved => {
        info!(
          timestamp,
          coin = %entry.input.coin,
          current_price = ?entry.result.current_price,
          target_hit = entry.result.target_hit,
          stop_loss_hit = entry.result.stop_loss_hit,
          "Entry resolved"
        );
        self.commit(&mut entries).await;
      }
      ApplyOutcome::PriceUpdated => self.commit(&mut entries).await,
      ApplyOutcome::Ignored | ApplyOutcome::Unchanged | ApplyOutcome::NotFound => {}
    }
    outcome
  }

  /// Hit counters over live in-memory entries, same filter as `recent`.
  pub async fn summary(&self) -> HitSummary {
    let now = self.now();
    let entries = self.entries.lock().await;
    let live: Vec<HistoryEntry> = entries
      .iter()
      .filter(|e| !self.policy.is_expired(e, now))
      .cloned()
      .collect();
    HitSummary::from_entries(&live)
  }

  /// Subscribe to change notifications (revision counter).
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.revision.subscribe()
  }

  /// Current revision.
  pub fn revision(&self) -> u64 {
    *self.revision.borrow()
  }

  /// Whether the backing storage is usable.
  pub async fn is_healthy(&self) -> bool {
    self.storage.is_healthy().await
  }

  /// Apply retention, persist the sequence, notify subscribers.
  async fn commit(&self, entries: &mut Vec<HistoryEntry>) {
    *entries = self.policy.apply(std::mem::take(entries), self.now());
    self.bump();

    match serde_json::to_string(&*entries) {
      Ok(json) => {
        if let Err(e) = self.storage.set(&self.key, &json).await {
          warn!(key = %self.key, error = %e, "Failed to persist history");
        }
      }
      Err(e) => warn!(error = %e, "Failed to serialize history"),
    }
  }

  fn bump(&self) {
    self.revision.send_modify(|r| *r += 1);
  }

  /// Read and parse the persisted slot.
  ///
  /// `None` means storage itself failed. A missing slot or a blob that
  /// doesn't parse is an empty history; malformed entries are skipped.
  async fn read_persisted(&self) -> Option<Vec<HistoryEntry>> {
    let raw = match self.storage.get(&self.key).await {
      Ok(Some(raw)) => raw,
      Ok(None) => return Some(Vec::new()),
      Err(e) => {
        warn!(key = %self.key, error = %e, "History storage unreadable");
        return None;
      }
    };

    let items = match serde_json::from_str::<Value>(&raw) {
      Ok(Value::Array(items)) => items,
      Ok(_) => {
        warn!(key = %self.key, "Persisted history is not a list, ignoring");
        return Some(Vec::new());
      }
      Err(e) => {
        warn!(key = %self.key, error = %e, "Persisted history unparsable, ignoring");
        return Some(Vec::new());
      }
    };

    let total = items.len();
    let entries: Vec<HistoryEntry> = items
      .into_iter()
      .filter_map(|item| match serde_json::from_value::<HistoryEntry>(item) {
        Ok(entry) => Some(entry),
        Err(e) => {
          warn!(error = %e, "Skipping malformed history entry");
          None
        }
      })
      .collect();

    debug!(total, parsed = entries.len(), "Persisted history read");
    Some(entries)
  }
}
