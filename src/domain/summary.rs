//! Hit counters over the history sequence.

use serde::Serialize;

use super::history::HistoryEntry;

/// Totals shown next to the history list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HitSummary {
    pub total: usize,
    pub pending: usize,
    pub targets_hit: usize,
    pub stop_losses_hit: usize,
}

impl HitSummary {
    /// Recompute from scratch. Cheap enough at 100 entries that there is
    /// no incremental bookkeeping to get out of sync.
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, entry| {
            acc.total += 1;
            if entry.result.target_hit {
                acc.targets_hit += 1;
            }
            if entry.result.stop_loss_hit {
                acc.stop_losses_hit += 1;
            }
            if !entry.is_resolved() {
                acc.pending += 1;
            }
            acc
        })
    }
}
