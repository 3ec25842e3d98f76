//! Highlight Cache - Premium Dashboard Feeds
//!
//! Polls the backend's pattern and bias feeds and keeps the last good
//! payload of each. A failed poll keeps the previous value.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ports::analysis::AnalysisService;

/// Cached payload with its fetch time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedFeed {
  pub data: Value,
  /// Unix ms of the successful fetch.
  pub fetched_at: i64,
}

/// Latest premium feed payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlights {
  pub patterns: Option<CachedFeed>,
  pub bias: Option<CachedFeed>,
}

/// Read-only cache over the premium feeds.
pub struct HighlightCache {
  service: Arc<dyn AnalysisService>,
  state: RwLock<Highlights>,
}

impl HighlightCache {
  pub fn new(service: Arc<dyn AnalysisService>) -> Self {
    Self {
      service,
      state: RwLock::new(Highlights::default()),
    }
  }

  pub async fn snapshot(&self) -> Highlights {
    self.state.read().await.clone()
  }

  /// Poll both feeds concurrently and keep whatever succeeded.
  pub async fn refresh(&self) {
    let (patterns, bias) =
      tokio::join!(self.service.premium_patterns(), self.service.premium_bias());
    let now = crate::domain::now_ms();

    let mut state = self.state.write().await;
    match patterns {
      Ok(data) => state.patterns = Some(CachedFeed { data, fetched_at: now }),
      Err(e) => warn!(error = %e, "Premium patterns poll failed, keeping cached value"),
    }
    match bias {
      Ok(data) => state.bias = Some(CachedFeed { data, fetched_at: now }),
      Err(e) => warn!(error = %e, "Premium bias poll failed, keeping cached value"),
    }

    debug!(
      has_patterns = state.patterns.is_some(),
      has_bias = state.bias.is_some(),
      "Highlights refreshed"
    );
  }
}
