//! Analyze-and-Record Use Case
//!
//! Validates trade input before any network call, submits it to the
//! analysis backend and records the result at the front of history.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::history::{HistoryEntry, TradeInput};
use crate::ports::analysis::AnalysisService;

use super::history_store::HistoryStore;

/// Problems with the submitted trade parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("coin is required")]
  MissingCoin,
  #[error("entry price must be a positive number, got {0}")]
  InvalidEntryPrice(f64),
  #[error("quantity must be a positive number, got {0}")]
  InvalidQuantity(f64),
  #[error("timeframe is required")]
  MissingTimeframe,
}

/// Why a submission produced no history entry.
#[derive(Debug, Error)]
pub enum SubmitError {
  #[error("invalid trade input: {0}")]
  Invalid(#[from] ValidationError),
  #[error("analysis backend failed: {0:#}")]
  Backend(anyhow::Error),
}

/// Check and normalize trade input (trimmed, upper-case symbol).
pub fn validate(input: &TradeInput) -> Result<TradeInput, ValidationError> {
  let coin = input.coin.trim().to_ascii_uppercase();
  if coin.is_empty() {
    return Err(ValidationError::MissingCoin);
  }
  if !input.entry_price.is_finite() || input.entry_price <= 0.0 {
    return Err(ValidationError::InvalidEntryPrice(input.entry_price));
  }
  if !input.quantity.is_finite() || input.quantity <= 0.0 {
    return Err(ValidationError::InvalidQuantity(input.quantity));
  }
  let timeframe = input.timeframe.trim();
  if timeframe.is_empty() {
    return Err(ValidationError::MissingTimeframe);
  }

  Ok(TradeInput {
    coin,
    timeframe: timeframe.to_string(),
    ..input.clone()
  })
}

/// Submits analyses and records them in history.
pub struct AnalyzeAndRecord {
  service: Arc<dyn AnalysisService>,
  store: Arc<HistoryStore>,
}

impl AnalyzeAndRecord {
  pub fn new(service: Arc<dyn AnalysisService>, store: Arc<HistoryStore>) -> Self {
    Self { service, store }
  }

  /// Validate, analyze, record.
  #[instrument(skip(self, input), fields(coin = %input.coin))]
  pub async fn submit(&self, input: TradeInput) -> Result<HistoryEntry, SubmitError> {
    let input = validate(&input)?;

    let result = self.service.analyze(&input).await.map_err(|e| {
      warn!(error = %e, "Analysis failed");
      SubmitError::Backend(e)
    })?;

    let entry = self.store.append(input, result).await;
    info!(
      timestamp = entry.timestamp,
      targets = entry.result.targets.len(),
      "Analysis recorded"
    );
    Ok(entry)
  }
}
