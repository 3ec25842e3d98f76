//! Backend Adapter - Status and Analysis Ports over HTTP
//!
//! Implements `TradeStatusSource` and `AnalysisService` on top of the
//! shared `BackendClient`. Never creates its own reqwest client.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::client::BackendClient;
use super::types::{AnalyzeRequest, ApiError, CheckTradeStatusRequest, CheckTradeStatusResponse};
use crate::domain::history::{AnalysisResult, StatusUpdate, TradeInput};
use crate::ports::analysis::AnalysisService;
use crate::ports::status::{StatusQuery, TradeStatusSource};

const ANALYZE_PATH: &str = "/analyze";
const CHECK_STATUS_PATH: &str = "/api/checkTradeStatus";
const PATTERNS_PATH: &str = "/premium/patterns";
const BIAS_PATH: &str = "/premium/bias";

/// Analytics backend adapter backed by the shared client.
pub struct BackendAdapter {
    client: Arc<BackendClient>,
}

impl BackendAdapter {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TradeStatusSource for BackendAdapter {
    #[instrument(skip(self, query), fields(coin = %query.coin))]
    async fn check_status(&self, query: &StatusQuery) -> Result<StatusUpdate> {
        let resp: CheckTradeStatusResponse = self
            .client
            .post_decoded(CHECK_STATUS_PATH, &CheckTradeStatusRequest::from(query))
            .await
            .context("Trade status check failed")?;

        debug!(
            current_price = ?resp.current_price,
            tgt_hit = resp.tgt_hit,
            sl_hit = resp.sl_hit,
            "Trade status received"
        );

        Ok(resp.into())
    }
}

#[async_trait]
impl AnalysisService for BackendAdapter {
    #[instrument(skip(self, input), fields(coin = %input.coin, timeframe = %input.timeframe))]
    async fn analyze(&self, input: &TradeInput) -> Result<AnalysisResult> {
        let body: Value = self
            .client
            .post_decoded(ANALYZE_PATH, &AnalyzeRequest::from(input))
            .await
            .context("Analysis request failed")?;

        if !body.is_object() {
            bail!("Analysis response is not a JSON object");
        }

        // The backend reports analysis failures as 200 + {"error": ...}.
        if let Ok(ApiError { error, detail }) = serde_json::from_value::<ApiError>(body.clone()) {
            if let Some(message) = error.or(detail) {
                if body.get("targets").is_none() {
                    bail!("Backend rejected analysis: {message}");
                }
            }
        }

        serde_json::from_value(body).context("Failed to parse analysis result")
    }

    async fn premium_patterns(&self) -> Result<Value> {
        self.client
            .get_decoded(PATTERNS_PATH)
            .await
            .context("Failed to fetch premium patterns")
    }

    async fn premium_bias(&self) -> Result<Value> {
        self.client
            .get_decoded(BIAS_PATH)
            .await
            .context("Failed to fetch premium bias")
    }
}
