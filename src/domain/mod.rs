//! Domain layer - History entries, retention and aggregation.
//!
//! Pure types and functions with no I/O. Everything here is
//! serializable and testable in isolation.

pub(crate) mod lenient;

pub mod history;
pub mod retention;
pub mod summary;

// Re-export core types for convenience
pub use history::{
    AnalysisResult, ApplyOutcome, EntryStatus, HistoryEntry, Market, PositionSide,
    StatusUpdate, TradeInput,
};
pub use retention::RetentionPolicy;
pub use summary::HitSummary;

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
