//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O) and exposes the
//! use cases over HTTP.
//!
//! Adapter categories:
//! - `api`: Analytics backend REST client
//! - `http`: Local HTTP API (history, health checks)
//! - `metrics`: Prometheus metrics export
//! - `persistence`: Key-value slot storage (JSON files, memory)

pub mod api;
pub mod http;
pub mod metrics;
pub mod persistence;
