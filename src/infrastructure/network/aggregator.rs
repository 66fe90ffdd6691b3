// SPDX-License-Identifier: MIT

use crate::domain::error::AppError;
use crate::domain::types::{AssetRef, Quote, Route, Venue};
use crate::services::swap::ports::QuoteSource;
use alloy::primitives::U256;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// 1inch-style quote payload. The aggregator reports a single bundled
/// output; venue-shopping and fees are folded into `dst_amount`.
#[derive(Deserialize, Debug)]
struct AggregatorQuoteResponse {
    #[serde(alias = "toAmount", alias = "dstAmount")]
    dst_amount: String,
}

/// HTTP adapter for the external DEX aggregator. Request/response shaping
/// only; route selection policy lives in the route finder.
pub struct AggregatorClient {
    client: Client,
    base_url: Url,
    name: String,
}

impl AggregatorClient {
    pub fn new(base_url: &str, name: &str, timeout_ms: u64) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid aggregator URL: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::Config(format!("Aggregator client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            name: name.to_string(),
        })
    }

    fn unavailable(&self, source: &AssetRef, dest: &AssetRef, reason: String) -> AppError {
        AppError::QuoteUnavailable {
            src: source.symbol.clone(),
            dest: dest.symbol.clone(),
            reason,
        }
    }
}

#[async_trait]
impl QuoteSource for AggregatorClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
    ) -> Result<Quote, AppError> {
        let url = self
            .base_url
            .join("quote")
            .map_err(|e| AppError::Config(format!("Invalid aggregator URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("src", format!("{:#x}", source.address)),
                ("dst", format!("{:#x}", dest.address)),
                ("amount", amount_in.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.unavailable(source, dest, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(source, dest, format!("status {status}")));
        }

        let payload: AggregatorQuoteResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(source, dest, format!("malformed response: {e}")))?;

        let amount_out = U256::from_str_radix(payload.dst_amount.trim(), 10)
            .map_err(|e| self.unavailable(source, dest, format!("bad dstAmount: {e}")))?;
        if amount_out.is_zero() {
            return Err(self.unavailable(source, dest, "no liquidity".to_string()));
        }

        tracing::debug!(
            target: "aggregator",
            provider = %self.name,
            pair = %format!("{}->{}", source.symbol, dest.symbol),
            amount_in = %amount_in,
            amount_out = %amount_out,
            "Aggregator quote"
        );

        let route = Route::direct(
            source.clone(),
            dest.clone(),
            Venue::Aggregator(self.name.clone()),
        );
        Ok(Quote::shape(route, amount_in, amount_out, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_known_amount_fields() {
        let v6: AggregatorQuoteResponse =
            serde_json::from_str(r#"{"dstAmount":"123456"}"#).unwrap();
        assert_eq!(v6.dst_amount, "123456");
        let v5: AggregatorQuoteResponse =
            serde_json::from_str(r#"{"toAmount":"42"}"#).unwrap();
        assert_eq!(v5.dst_amount, "42");
    }
}
