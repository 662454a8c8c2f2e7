//! 1inch Swap API integration

use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::*;
use crate::blockchain::traits::TxPayload;
use crate::core::errors::BotError;

/// 1inch API client
pub struct OneInchClient {
    client: Client,
    api_key: Secret<String>,
    base_url: String,
    fee_percent: Option<f64>,
    referrer: Option<String>,
}

/// Raw `/swap` response. `dstAmount` was called `toAmount` by older API versions,
/// and the token info blocks were renamed along with it.
#[derive(Debug, Deserialize)]
struct OneInchSwapResponse {
    #[serde(rename = "dstAmount", alias = "toAmount")]
    dst_amount: String,
    #[serde(default, rename = "srcToken", alias = "fromToken")]
    src_token: Option<TokenInfo>,
    #[serde(default, rename = "dstToken", alias = "toToken")]
    dst_token: Option<TokenInfo>,
    tx: TransactionData,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    address: Address,
    #[serde(default)]
    decimals: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    to: Address,
    data: Bytes,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpenderResponse {
    address: Address,
}

impl OneInchClient {
    pub fn new(base_url: impl Into<String>, api_key: Secret<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fee_percent: None,
            referrer: None,
        }
    }

    /// Integrator fee (percent) and the address that receives it.
    pub fn with_fee(mut self, fee_percent: Option<f64>, referrer: Option<String>) -> Self {
        self.fee_percent = fee_percent;
        self.referrer = referrer;
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, BotError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BotError::Network(format!("1inch API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Network(format!("1inch API returned {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| BotError::MalformedQuote(format!("Cannot parse 1inch response: {}", e)))
    }
}

#[async_trait]
impl SwapApi for OneInchClient {
    async fn quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuote, BotError> {
        let url = format!("{}/{}/swap", self.base_url, request.chain_id);
        let mut query = vec![
            ("src", format!("{:?}", request.src_token)),
            ("dst", format!("{:?}", request.dst_token)),
            ("amount", request.amount.to_string()),
            ("from", format!("{:?}", request.account)),
            ("origin", format!("{:?}", request.account)),
            ("receiver", format!("{:?}", request.receiver)),
            ("slippage", request.slippage.to_string()),
            ("disableEstimate", "true".to_string()),
            ("includeTokensInfo", "true".to_string()),
        ];
        if let Some(fee) = self.fee_percent {
            query.push(("fee", fee.to_string()));
        }
        if let Some(referrer) = &self.referrer {
            query.push(("referrer", referrer.clone()));
        }

        debug!(chain_id = request.chain_id, src = %request.src_symbol, dst = %request.dst_symbol, "Requesting swap quote");
        let raw: OneInchSwapResponse = self.get_json(&url, &query).await?;
        normalize_swap_response(raw, request)
    }

    async fn spender(&self, chain_id: u64) -> Result<Address, BotError> {
        let url = format!("{}/{}/approve/spender", self.base_url, chain_id);
        let raw: SpenderResponse = self.get_json(&url, &[]).await?;
        Ok(raw.address)
    }
}

/// The single place that maps a raw 1inch payload to `SwapQuote`.
fn normalize_swap_response(
    raw: OneInchSwapResponse,
    request: &SwapQuoteRequest,
) -> Result<SwapQuote, BotError> {
    let expected_out = U256::from_dec_str(raw.dst_amount.trim())
        .map_err(|e| BotError::MalformedQuote(format!("Bad dstAmount '{}': {}", raw.dst_amount, e)))?;

    let value = match raw.tx.value.as_deref().map(str::trim) {
        None | Some("") => U256::zero(),
        Some(v) => U256::from_dec_str(v)
            .map_err(|e| BotError::MalformedQuote(format!("Bad tx.value '{}': {}", v, e)))?,
    };

    // A zero address means upstream left the field blank; any other mismatch is a quote for the wrong token.
    if let Some(info) = &raw.dst_token {
        if !info.address.is_zero() && info.address != request.dst_token {
            warn!(reported = ?info.address, requested = ?request.dst_token, "Output token differs from request");
            return Err(BotError::MalformedQuote(format!(
                "quote outputs {:?}, requested {} at {:?}",
                info.address, request.dst_symbol, request.dst_token
            )));
        }
    }

    Ok(SwapQuote {
        chain_id: request.chain_id,
        src_token: request.src_token,
        src_symbol: request.src_symbol,
        src_decimals: raw.src_token.as_ref().and_then(|t| t.decimals),
        dst_token: request.dst_token,
        dst_symbol: request.dst_symbol,
        dst_decimals: raw.dst_token.as_ref().and_then(|t| t.decimals),
        amount_in: request.amount,
        expected_out,
        tx: TxPayload { chain_id: request.chain_id, to: raw.tx.to, data: raw.tx.data, value },
        spender: raw.tx.to,
    })
}
