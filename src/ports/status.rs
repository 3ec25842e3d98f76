//! Trade Status Port - Target / Stop-Loss Hit Checks
//!
//! The analytics backend decides whether a target or stop-loss has
//! been reached; this port only carries the question and the answer.

use async_trait::async_trait;

use crate::domain::history::{HistoryEntry, StatusUpdate};

/// Everything the status endpoint needs to judge one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusQuery {
  /// Asset symbol.
  pub coin: String,
  /// Position entry price.
  pub entry_price: f64,
  /// Take-profit levels.
  pub targets: Vec<f64>,
  /// User-specified stop-loss.
  pub user_stoploss: Option<f64>,
  /// Market-derived stop-losses.
  pub market_stoplosses: Vec<f64>,
}

impl From<&HistoryEntry> for StatusQuery {
  fn from(entry: &HistoryEntry) -> Self {
    Self {
      coin: entry.input.coin.clone(),
      entry_price: entry.input.entry_price,
      targets: entry.result.targets.clone(),
      user_stoploss: entry.result.user_stoploss,
      market_stoplosses: entry.result.market_stoplosses.clone(),
    }
  }
}

/// Trait for live trade status providers.
#[async_trait]
pub trait TradeStatusSource: Send + Sync + 'static {
  /// Fetch current price and hit flags for one position.
  async fn check_status(&self, query: &StatusQuery) -> anyhow::Result<StatusUpdate>;
}
