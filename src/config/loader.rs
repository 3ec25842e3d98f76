//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages for
//! misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::ports::storage::is_valid_key;

/// Upper bound on `backend.max_retries`.
pub const MAX_BACKEND_RETRIES: u32 = 10;

/// Environment variable overriding `backend.base_url`.
pub const ENV_BACKEND_URL: &str = "BACKEND_BASE_URL";
/// Environment variable overriding `backend.api_token`.
pub const ENV_BACKEND_TOKEN: &str = "BACKEND_API_TOKEN";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, |name| std::env::var(name).ok());
  validate_config(&config)?;

  info!(
    backend = %config.backend.base_url,
    storage = ?config.history.storage,
    reconcile_secs = config.schedule.reconcile_interval_seconds,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse TOML text into a config (no validation).
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).context("Failed to parse config.toml")
}

/// Apply environment overrides through `lookup` (injectable for tests).
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
  if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
    config.backend.base_url = url.trim().to_string();
  }
  if let Some(token) = lookup(ENV_BACKEND_TOKEN).filter(|v| !v.trim().is_empty()) {
    config.backend.api_token = Some(token);
  }
}

/// Validate all configuration parameters.
pub fn validate_config(config: &AppConfig) -> Result<()> {
  // Backend validation
  anyhow::ensure!(
    config.backend.base_url.starts_with("http://")
      || config.backend.base_url.starts_with("https://"),
    "backend.base_url must be an http(s) URL, got {:?}",
    config.backend.base_url
  );
  anyhow::ensure!(
    config.backend.timeout_seconds > 0,
    "backend.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    config.backend.max_concurrent > 0,
    "backend.max_concurrent must be positive"
  );
  anyhow::ensure!(
    config.backend.max_retries <= MAX_BACKEND_RETRIES,
    "backend.max_retries must be at most {MAX_BACKEND_RETRIES}, got {}",
    config.backend.max_retries
  );

  // History validation
  anyhow::ensure!(
    config.history.max_entries > 0,
    "history.max_entries must be positive"
  );
  anyhow::ensure!(
    config.history.retention_hours > 0,
    "history.retention_hours must be positive"
  );
  anyhow::ensure!(
    is_valid_key(&config.history.storage_key),
    "history.storage_key must be non-empty [A-Za-z0-9_-], got {:?}",
    config.history.storage_key
  );

  // Schedule validation
  anyhow::ensure!(
    config.schedule.reconcile_interval_seconds > 0,
    "schedule.reconcile_interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.schedule.recent_refresh_seconds > 0,
    "schedule.recent_refresh_seconds must be positive"
  );
  anyhow::ensure!(
    config.schedule.max_in_flight > 0,
    "schedule.max_in_flight must be positive"
  );

  Ok(())
}
