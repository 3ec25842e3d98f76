//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export via axum 0.7. Liveness and
//! readiness checks live on the main HTTP API.

pub mod prometheus;

pub use self::prometheus::MetricsRegistry;
