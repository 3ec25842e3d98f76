//! Analysis Port - Trade Analysis and Premium Feeds
//!
//! Pattern detection, bias scoring and target computation all happen
//! in the remote backend. The tracker submits inputs and stores the
//! result it gets back.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::history::{AnalysisResult, TradeInput};

/// Trait for the remote analysis backend.
#[async_trait]
pub trait AnalysisService: Send + Sync + 'static {
  /// Submit trade parameters and receive the full analysis.
  async fn analyze(&self, input: &TradeInput) -> anyhow::Result<AnalysisResult>;

  /// Latest detected chart patterns (dashboard highlight feed).
  async fn premium_patterns(&self) -> anyhow::Result<Value>;

  /// Latest market bias readings (dashboard highlight feed).
  async fn premium_bias(&self) -> anyhow::Result<Value>;
}
