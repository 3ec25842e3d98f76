//! Use Cases Layer - Application Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! tracker's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `HistoryStore`: Bounded, time-windowed, persisted history
//! - `StatusReconciler`: Poll-and-patch of pending entries
//! - `Scheduler`: Owned periodic jobs with coordinated shutdown
//! - `RecentFeed`: Read-only compact history snapshot
//! - `HighlightCache`: Premium dashboard feed cache
//! - `AnalyzeAndRecord`: Validate, analyze, record

pub mod analysis;
pub mod highlights;
pub mod history_store;
pub mod recent_view;
pub mod reconciler;
pub mod scheduler;

pub use analysis::{AnalyzeAndRecord, SubmitError, ValidationError};
pub use highlights::HighlightCache;
pub use history_store::HistoryStore;
pub use recent_view::RecentFeed;
pub use reconciler::{CycleReport, StatusReconciler};
pub use scheduler::Scheduler;
