//! Retention policy for the history sequence.
//!
//! History is bounded two ways: by age (entries older than the window
//! are dropped) and by count (only the newest `max_entries` are kept).
//! The sequence is newest-first, so "keep the first N" keeps the newest.

use std::time::Duration;

use super::history::HistoryEntry;

/// Three days, the default display window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Default capacity of the history sequence.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Age and capacity bounds applied on every read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_entries: usize,
    pub max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            max_entries,
            max_age,
        }
    }

    /// Oldest timestamp still inside the window at `now_ms`.
    pub fn cutoff_ms(&self, now_ms: i64) -> i64 {
        let window = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(window)
    }

    pub fn is_expired(&self, entry: &HistoryEntry, now_ms: i64) -> bool {
        entry.timestamp <= self.cutoff_ms(now_ms)
    }

    /// Drop expired entries, then keep the first `max_entries`.
    pub fn apply(&self, entries: Vec<HistoryEntry>, now_ms: i64) -> Vec<HistoryEntry> {
        let cutoff = self.cutoff_ms(now_ms);
        entries
            .into_iter()
            .filter(|e| e.timestamp > cutoff)
            .take(self.max_entries)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::{AnalysisResult, Market, PositionSide, TradeInput};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn entry_at(timestamp: i64) -> HistoryEntry {
        HistoryEntry::new(
            TradeInput {
                coin: "SOLUSDT".to_string(),
                market: Market::Spot,
                position_type: PositionSide::Long,
                entry_price: 150.0,
                quantity: 1.0,
                timeframe: "15m".to_string(),
            },
            AnalysisResult::default(),
            timestamp,
        )
    }

    #[test]
    fn test_window_drops_old_entries() {
        let now = 1_700_000_000_000;
        let policy = RetentionPolicy::default();
        let kept = policy.apply(
            vec![entry_at(now), entry_at(now - DAY_MS), entry_at(now - 4 * DAY_MS)],
            now,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].timestamp, now);
        assert_eq!(kept[1].timestamp, now - DAY_MS);
    }

    #[test]
    fn test_capacity_keeps_first() {
        let now = 1_700_000_000_000;
        let policy = RetentionPolicy::new(3, DEFAULT_MAX_AGE);
        let entries = (0..5).map(|i| entry_at(now - i)).collect();
        let kept = policy.apply(entries, now);
        assert_eq!(
            kept.iter().map(|e| e.timestamp).collect::<Vec<_>>(),
            vec![now, now - 1, now - 2]
        );
    }

    #[test]
    fn test_boundary_is_expired() {
        let now = 1_700_000_000_000;
        let policy = RetentionPolicy::default();
        assert!(policy.is_expired(&entry_at(now - 3 * DAY_MS), now));
        assert!(!policy.is_expired(&entry_at(now - 3 * DAY_MS + 1), now));
    }
}
