//! Trade history domain types.
//!
//! A `HistoryEntry` is one submitted analysis: the immutable trade input,
//! the backend's analysis result, and the creation timestamp that doubles
//! as the entry's identity. Only the result's current price and hit flags
//! ever change, and only while the entry is still pending.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;

/// Market the position was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    #[serde(alias = "Futures", alias = "FUTURES")]
    Futures,
    #[serde(alias = "Spot", alias = "SPOT")]
    Spot,
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Futures => write!(f, "futures"),
            Self::Spot => write!(f, "spot"),
        }
    }
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    #[serde(alias = "long", alias = "LONG")]
    Long,
    #[serde(alias = "short", alias = "SHORT")]
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

/// Parameters the user submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeInput {
    /// Asset symbol, e.g. `BTCUSDT`.
    pub coin: String,
    /// Futures or spot.
    pub market: Market,
    /// Long or short.
    pub position_type: PositionSide,
    /// Entry price of the position.
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub entry_price: f64,
    /// Position size in base units.
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub quantity: f64,
    /// Chart timeframe the analysis ran on (`15m`, `1h`, ...).
    pub timeframe: String,
}

/// Analysis result as returned by the backend and kept in history.
///
/// Reading accepts both the backend's snake_case keys and the camelCase
/// keys older clients wrote. Fields the tracker does not interpret
/// (`sentiment`, `patterns`, `market_confidence`, ...) are kept in
/// `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    /// Last known market price; refreshed by reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    /// Take-profit levels in backend order. May repeat.
    pub targets: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_stoploss: Option<f64>,
    /// Stop-loss levels derived from market structure. May repeat.
    pub market_stoplosses: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
    #[serde(rename = "targetHit")]
    pub target_hit: bool,
    #[serde(rename = "stopLossHit")]
    pub stop_loss_hit: bool,
    /// Backend fields passed through unmodified.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remove the first present, non-null key from `map`, dropping the
/// alternatives so they don't leak into `extra`.
fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(value) = map.remove(*key) {
            if found.is_none() && !value.is_null() {
                found = Some(value);
            }
        }
    }
    found
}

impl From<Map<String, Value>> for AnalysisResult {
    fn from(mut map: Map<String, Value>) -> Self {
        let coin = take_first(&mut map, &["coin"])
            .and_then(|v| v.as_str().map(str::to_string));
        let position_type = take_first(&mut map, &["position_type", "positionType"])
            .and_then(|v| v.as_str().map(str::to_string));
        let entry_price = take_first(&mut map, &["entry_price", "entryPrice"])
            .as_ref()
            .and_then(lenient::value_to_f64);
        let current_price = take_first(&mut map, &["current_price", "currentPrice"])
            .as_ref()
            .and_then(lenient::value_to_f64);
        let targets = take_first(&mut map, &["targets", "targets_and_stoplosses"])
            .as_ref()
            .map(lenient::value_to_f64_list)
            .unwrap_or_default();
        let user_stoploss = take_first(&mut map, &["user_stoploss", "user_sl", "userStoploss"])
            .as_ref()
            .and_then(lenient::value_to_f64);
        let market_stoplosses =
            take_first(&mut map, &["market_stoplosses", "market_sl", "marketStoplosses"])
                .as_ref()
                .map(lenient::value_to_f64_list)
                .unwrap_or_default();
        let profit_loss = take_first(&mut map, &["profit_loss", "profitLoss"])
            .as_ref()
            .and_then(lenient::value_to_f64);
        let target_hit = take_first(&mut map, &["targetHit", "tgtHit"])
            .as_ref()
            .is_some_and(lenient::value_to_flag);
        let stop_loss_hit = take_first(&mut map, &["stopLossHit", "slHit"])
            .as_ref()
            .is_some_and(lenient::value_to_flag);

        Self {
            coin,
            position_type,
            entry_price,
            current_price,
            targets,
            user_stoploss,
            market_stoplosses,
            profit_loss,
            target_hit,
            stop_loss_hit,
            extra: map,
        }
    }
}

/// De-duplicate prices keeping the first occurrence of each.
fn distinct(prices: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::new();
    for price in prices {
        if !out.iter().any(|p| (p - price).abs() < f64::EPSILON) {
            out.push(price);
        }
    }
    out
}

impl AnalysisResult {
    /// Targets without repeats, in backend order.
    pub fn distinct_targets(&self) -> Vec<f64> {
        distinct(self.targets.iter().copied())
    }

    /// User stop-loss followed by market stop-losses, without repeats.
    pub fn distinct_stoplosses(&self) -> Vec<f64> {
        distinct(
            self.user_stoploss
                .into_iter()
                .chain(self.market_stoplosses.iter().copied()),
        )
    }
}

/// Reconciliation state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    /// Neither a target nor a stop-loss has been hit yet.
    Pending,
    /// At least one hit flag is set. Terminal.
    Resolved,
}

/// Status reported by the backend for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusUpdate {
    pub current_price: Option<f64>,
    pub target_hit: bool,
    pub stop_loss_hit: bool,
}

/// What `HistoryEntry::apply_status` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Entry was already resolved; nothing written.
    Ignored,
    /// Update carried no current price; nothing written.
    Unchanged,
    /// Price refreshed, entry still pending.
    PriceUpdated,
    /// A hit flag turned true.
    Resolved,
    /// No entry with that timestamp.
    NotFound,
}

/// One persisted analysis and its evolving outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation time in Unix milliseconds. Identity and sort key.
    pub timestamp: i64,
    pub input: TradeInput,
    pub result: AnalysisResult,
}

impl HistoryEntry {
    pub fn new(input: TradeInput, result: AnalysisResult, timestamp: i64) -> Self {
        Self {
            timestamp,
            input,
            result,
        }
    }

    pub fn status(&self) -> EntryStatus {
        if self.result.target_hit || self.result.stop_loss_hit {
            EntryStatus::Resolved
        } else {
            EntryStatus::Pending
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status() == EntryStatus::Resolved
    }

    /// Patch current price and hit flags from a status response.
    ///
    /// Resolved entries are never touched. Responses without a current
    /// price are treated as "no news".
    pub fn apply_status(&mut self, update: &StatusUpdate) -> ApplyOutcome {
        if self.is_resolved() {
            return ApplyOutcome::Ignored;
        }
        let Some(price) = update.current_price else {
            return ApplyOutcome::Unchanged;
        };

        self.result.current_price = Some(price);
        self.result.target_hit = update.target_hit;
        self.result.stop_loss_hit = update.stop_loss_hit;

        if self.is_resolved() {
            ApplyOutcome::Resolved
        } else {
            ApplyOutcome::PriceUpdated
        }
    }

    /// Mark-to-market P&L from the last known price.
    pub fn unrealized_pnl(&self) -> Option<f64> {
        let current = self.result.current_price?;
        let diff = match self.input.position_type {
            PositionSide::Long => current - self.input.entry_price,
            PositionSide::Short => self.input.entry_price - current,
        };
        Some(diff * self.input.quantity)
    }
}
