//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`, with the
//! backend URL and token overridable from the environment. Every
//! section has defaults so a near-empty file is a valid config.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::retention::RetentionPolicy;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Analytics backend endpoint.
  pub backend: BackendConfig,
  /// History persistence and retention.
  pub history: HistoryConfig,
  /// Periodic job intervals.
  pub schedule: ScheduleConfig,
  /// Local HTTP API.
  pub server: ServerConfig,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  pub log_level: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: "trade-history-tracker".to_string(),
      log_level: "info".to_string(),
    }
  }
}

/// Analytics backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
  /// Base URL (`BACKEND_BASE_URL` overrides).
  pub base_url: String,
  /// Bearer token (`BACKEND_API_TOKEN` overrides). Never put in git.
  pub api_token: Option<String>,
  /// Request timeout in seconds.
  pub timeout_seconds: u64,
  /// Maximum concurrent requests to the backend.
  pub max_concurrent: usize,
  /// Retries on 5xx / 429 / transport errors.
  pub max_retries: u32,
  /// Base retry delay in milliseconds (doubles per attempt).
  pub retry_base_delay_ms: u64,
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000".to_string(),
      api_token: None,
      timeout_seconds: 15,
      max_concurrent: 8,
      max_retries: 2,
      retry_base_delay_ms: 250,
    }
  }
}

/// Where history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
  /// One JSON file per key in `data_dir`.
  File,
  /// Process memory only.
  Memory,
}

/// History persistence configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
  pub storage: StorageKind,
  /// Directory for file storage.
  pub data_dir: String,
  /// Slot the history blob is stored under.
  pub storage_key: String,
  /// Capacity bound.
  pub max_entries: usize,
  /// Age bound in hours.
  pub retention_hours: u64,
  /// Entries in the compact recent view.
  pub recent_limit: usize,
}

impl Default for HistoryConfig {
  fn default() -> Self {
    Self {
      storage: StorageKind::File,
      data_dir: "data".to_string(),
      storage_key: crate::usecases::history_store::DEFAULT_STORAGE_KEY.to_string(),
      max_entries: crate::domain::retention::DEFAULT_MAX_ENTRIES,
      retention_hours: 72,
      recent_limit: crate::usecases::recent_view::DEFAULT_RECENT_LIMIT,
    }
  }
}

impl HistoryConfig {
  pub fn retention_policy(&self) -> RetentionPolicy {
    RetentionPolicy::new(
      self.max_entries,
      Duration::from_secs(self.retention_hours * 60 * 60),
    )
  }
}

/// Periodic job configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
  /// Reconciliation interval in seconds.
  pub reconcile_interval_seconds: u64,
  /// Status requests in flight per cycle.
  pub max_in_flight: usize,
  /// Compact view refresh in seconds.
  pub recent_refresh_seconds: u64,
  /// Premium feed poll in seconds (0 disables).
  pub highlights_refresh_seconds: u64,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      reconcile_interval_seconds: 300,
      max_in_flight: 8,
      recent_refresh_seconds: 30,
      highlights_refresh_seconds: 60,
    }
  }
}

/// Local HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub enabled: bool,
  pub bind_address: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: "127.0.0.1:8080".to_string(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  pub enabled: bool,
  /// Metrics server bind address.
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: "127.0.0.1:9090".to_string(),
    }
  }
}
