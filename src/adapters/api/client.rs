//! Backend HTTP Client - Bounded, Retrying REST Client
//!
//! Wraps reqwest with a concurrency limit, timeouts and bounded
//! retries for every call to the analytics backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Upper bound on a single retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay before retry `attempt` (1-based): base doubled per attempt,
/// capped at `MAX_RETRY_DELAY`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
  base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Configuration for the backend HTTP client.
#[derive(Debug, Clone)]
pub struct BackendClientConfig {
  /// Base URL of the analytics backend (no trailing slash).
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
  /// Optional bearer token sent on every request.
  pub api_token: Option<String>,
}

impl Default for BackendClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000".to_string(),
      timeout: Duration::from_secs(30),
      max_concurrent: 8,
      max_retries: 2,
      retry_base_delay: Duration::from_millis(250),
      api_token: None,
    }
  }
}

/// Concurrency-limited HTTP client for the analytics backend.
pub struct BackendClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: BackendClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
}

impl BackendClient {
  /// Create a new backend client.
  pub fn new(mut config: BackendClientConfig) -> Result<Self> {
    anyhow::ensure!(config.max_concurrent > 0, "max_concurrent must be positive");

    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(config.max_concurrent)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
    config.base_url = config.base_url.trim_end_matches('/').to_string();

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  /// Base URL requests are resolved against.
  pub fn base_url(&self) -> &str {
    &self.config.base_url
  }

  /// Execute a GET request.
  pub async fn get(&self, path: &str) -> Result<Response> {
    let url = format!("{}{}", self.config.base_url, path);
    let request = self.http.get(&url);
    self.execute_with_retry(request, "GET", path).await
  }

  /// Execute a POST request with a JSON body.
  pub async fn post_json<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<Response> {
    let url = format!("{}{}", self.config.base_url, path);
    let request = self.http.post(&url).json(body);
    self.execute_with_retry(request, "POST", path).await
  }

  /// GET and decode a JSON response.
  pub async fn get_decoded<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    self
      .get(path)
      .await?
      .json::<T>()
      .await
      .with_context(|| format!("Failed to decode response from {path}"))
  }

  /// POST a JSON body and decode the JSON response.
  pub async fn post_decoded<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T> {
    self
      .post_json(path, body)
      .await?
      .json::<T>()
      .await
      .with_context(|| format!("Failed to decode response from {path}"))
  }

  /// Execute request with concurrency limiting and retries.
  async fn execute_with_retry(
    &self,
    request: RequestBuilder,
    method: &str,
    path: &str,
  ) -> Result<Response> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), method, path, "Retrying request");
        sleep(delay).await;
      }

      let mut req = request
        .try_clone()
        .context("Failed to clone request")?;

      if let Some(token) = &self.config.api_token {
        req = req.bearer_auth(token);
      }

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(method, path, "Rate limited by backend, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, method, path, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Backend error {status} on {method} {path}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, method, path, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_backoff_doubles_then_caps() {
    let base = Duration::from_millis(250);
    assert_eq!(backoff_delay(base, 1), Duration::from_millis(250));
    assert_eq!(backoff_delay(base, 3), Duration::from_secs(1));
    assert_eq!(backoff_delay(base, 40), MAX_RETRY_DELAY);
    assert_eq!(backoff_delay(Duration::from_secs(u64::MAX), 2), MAX_RETRY_DELAY);
  }
}
