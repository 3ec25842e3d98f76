//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `KeyValueStorage`: Whole-blob persisted slots (history lives in one)
//! - `TradeStatusSource`: Live price / target / stop-loss hit checks
//! - `AnalysisService`: Trade analysis and premium dashboard feeds

pub mod analysis;
pub mod status;
pub mod storage;
