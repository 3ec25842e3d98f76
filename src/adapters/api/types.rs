//! Backend API Request/Response Types
//!
//! Serialization types for the analytics backend REST API.

use serde::{Deserialize, Serialize};

use crate::domain::history::{Market, PositionSide, StatusUpdate, TradeInput};
use crate::domain::lenient;
use crate::ports::status::StatusQuery;

/// Payload for `POST /analyze`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest<'a> {
  pub coin: &'a str,
  pub market: Market,
  pub position_type: PositionSide,
  pub entry_price: f64,
  pub quantity: f64,
  pub timeframe: &'a str,
}

impl<'a> From<&'a TradeInput> for AnalyzeRequest<'a> {
  fn from(input: &'a TradeInput) -> Self {
    Self {
      coin: &input.coin,
      market: input.market,
      position_type: input.position_type,
      entry_price: input.entry_price,
      quantity: input.quantity,
      timeframe: &input.timeframe,
    }
  }
}

/// Payload for `POST /api/checkTradeStatus`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTradeStatusRequest<'a> {
  pub coin: &'a str,
  pub entry_price: f64,
  pub targets: &'a [f64],
  pub user_stoploss: Option<f64>,
  pub market_stoplosses: &'a [f64],
}

impl<'a> From<&'a StatusQuery> for CheckTradeStatusRequest<'a> {
  fn from(query: &'a StatusQuery) -> Self {
    Self {
      coin: &query.coin,
      entry_price: query.entry_price,
      targets: &query.targets,
      user_stoploss: query.user_stoploss,
      market_stoplosses: &query.market_stoplosses,
    }
  }
}

/// Response from `POST /api/checkTradeStatus`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckTradeStatusResponse {
  /// Latest market price. Missing when the backend has no quote.
  #[serde(default, rename = "currentPrice", alias = "current_price", deserialize_with = "lenient::opt_f64")]
  pub current_price: Option<f64>,
  /// A take-profit level was reached.
  #[serde(default, rename = "tgtHit", alias = "targetHit", deserialize_with = "lenient::flag")]
  pub tgt_hit: bool,
  /// A stop-loss level was reached.
  #[serde(default, rename = "slHit", alias = "stopLossHit", deserialize_with = "lenient::flag")]
  pub sl_hit: bool,
}

impl From<CheckTradeStatusResponse> for StatusUpdate {
  fn from(resp: CheckTradeStatusResponse) -> Self {
    Self {
      current_price: resp.current_price,
      target_hit: resp.tgt_hit,
      stop_loss_hit: resp.sl_hit,
    }
  }
}

/// Error body the backend returns alongside non-2xx or failed analyses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
  /// Error message.
  pub error: Option<String>,
  /// Alternative message field.
  pub detail: Option<String>,
}
