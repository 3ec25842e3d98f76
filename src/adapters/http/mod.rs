//! Local HTTP API
//!
//! Exposes the history, its summary, manual reconciliation, the
//! analyze-and-record flow and the premium highlights over axum 0.7,
//! plus liveness / readiness checks.

pub mod server;

pub use server::{ApiServer, ApiState, router};
