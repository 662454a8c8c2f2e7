//! Relay bridge API integration

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::resolve_destination_currency;
use super::types::*;
use crate::blockchain::chains::ChainRegistry;
use crate::blockchain::traits::TxPayload;
use crate::core::errors::BotError;

/// Relay API client
pub struct RelayClient {
    client: Client,
    base_url: String,
    registry: Arc<ChainRegistry>,
    slippage_bps: String,
    referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayQuoteResponse {
    #[serde(default)]
    steps: Vec<RawStep>,
    #[serde(default)]
    details: Option<RawDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    id: String,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<RawTxData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTxData {
    to: Address,
    #[serde(default)]
    data: Option<Bytes>,
    #[serde(default)]
    value: Option<serde_json::Value>,
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetails {
    #[serde(default)]
    time_estimate: Option<f64>,
    #[serde(default)]
    currency_out: Option<RawCurrencyAmount>,
}

#[derive(Debug, Deserialize)]
struct RawCurrencyAmount {
    #[serde(default)]
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayStatusResponse {
    status: String,
}

impl RelayClient {
    pub fn new(
        base_url: impl Into<String>,
        registry: Arc<ChainRegistry>,
        slippage_bps: impl Into<String>,
        referrer: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            registry,
            slippage_bps: slippage_bps.into(),
            referrer,
        }
    }
}

#[async_trait]
impl BridgeApi for RelayClient {
    async fn quote(&self, request: &BridgeQuoteRequest) -> Result<BridgeQuote, BotError> {
        let destination_currency = resolve_destination_currency(&self.registry, request)?;
        let url = format!("{}/quote", self.base_url);

        let mut body = serde_json::json!({
            "user": format!("{:?}", request.user),
            "recipient": format!("{:?}", request.recipient),
            "originChainId": request.origin_chain_id,
            "destinationChainId": request.destination_chain_id,
            "originCurrency": format!("{:?}", request.origin_currency),
            "destinationCurrency": format!("{:?}", destination_currency),
            "amount": request.amount.to_string(),
            "tradeType": "EXACT_INPUT",
            "slippageTolerance": self.slippage_bps,
        });
        if let Some(referrer) = &self.referrer {
            body["referrer"] = serde_json::Value::String(referrer.clone());
        }

        debug!(
            origin = request.origin_chain_id,
            destination = request.destination_chain_id,
            "Requesting bridge quote"
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Network(format!("Relay quote request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Network(format!("Relay quote returned {}: {}", status, body)));
        }

        let raw: RelayQuoteResponse = response
            .json()
            .await
            .map_err(|e| BotError::MalformedQuote(format!("Cannot parse Relay quote: {}", e)))?;

        normalize_quote(raw, request, destination_currency)
    }

    async fn status(&self, request_id: &str) -> Result<BridgeStatus, BotError> {
        let url = format!("{}/intents/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("requestId", request_id)])
            .send()
            .await
            .map_err(|e| BotError::Network(format!("Relay status request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Network(format!("Relay status returned {}: {}", status, body)));
        }

        let raw: RelayStatusResponse = response
            .json()
            .await
            .map_err(|e| BotError::Network(format!("Cannot parse Relay status: {}", e)))?;

        Ok(BridgeStatus { request_id: request_id.to_string(), status: raw.status })
    }
}

fn parse_value(value: &Option<serde_json::Value>) -> Result<U256, BotError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(U256::zero()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(U256::zero()),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x") {
                Some(hex_part) => U256::from_str_radix(hex_part, 16).map_err(|e| e.to_string()),
                None => U256::from_dec_str(s).map_err(|e| e.to_string()),
            };
            parsed.map_err(|e| BotError::MalformedQuote(format!("Bad tx value '{}': {}", s, e)))
        }
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| BotError::MalformedQuote(format!("Bad tx value {}", n))),
        Some(other) => Err(BotError::MalformedQuote(format!("Bad tx value {}", other))),
    }
}

/// The single place that maps a raw Relay quote to `BridgeQuote`.
fn normalize_quote(
    raw: RelayQuoteResponse,
    request: &BridgeQuoteRequest,
    destination_currency: Address,
) -> Result<BridgeQuote, BotError> {
    let mut steps = Vec::with_capacity(raw.steps.len());
    for step in raw.steps {
        let mut items = Vec::with_capacity(step.items.len());
        for item in step.items {
            // signature-only items carry no transaction
            let Some(data) = item.data else { continue };
            items.push(BridgeStepItem {
                status: item.status,
                tx: TxPayload {
                    chain_id: data.chain_id,
                    to: data.to,
                    data: data.data.unwrap_or_default(),
                    value: parse_value(&data.value)?,
                },
            });
        }
        steps.push(BridgeStep { id: step.id, request_id: step.request_id, items });
    }

    let request_id = steps.iter().find_map(|s| s.request_id.clone());
    let (time_estimate_secs, expected_out) = match raw.details {
        Some(details) => (
            details.time_estimate.filter(|t| *t >= 0.0).map(|t| t.round() as u64),
            details
                .currency_out
                .and_then(|c| c.amount)
                .and_then(|a| U256::from_dec_str(a.trim()).ok()),
        ),
        None => (None, None),
    };

    Ok(BridgeQuote {
        origin_chain_id: request.origin_chain_id,
        destination_chain_id: request.destination_chain_id,
        origin_currency: request.origin_currency,
        destination_currency,
        amount: request.amount,
        expected_out,
        steps,
        request_id,
        time_estimate_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::TokenSymbol;

    fn request() -> BridgeQuoteRequest {
        BridgeQuoteRequest {
            user: Address::repeat_byte(0xaa),
            recipient: Address::repeat_byte(0xaa),
            origin_chain_id: 8453,
            destination_chain_id: 10,
            origin_currency: Address::repeat_byte(0x02),
            origin_symbol: TokenSymbol::Usdc,
            destination: DestinationCurrency::Symbol(TokenSymbol::Weth),
            amount: U256::from(5_000_000u64),
        }
    }

    #[test]
    fn normalizes_steps_and_details() {
        let raw: RelayQuoteResponse = serde_json::from_value(serde_json::json!({
            "steps": [
                { "id": "approve", "kind": "transaction", "items": [
                    { "status": "incomplete", "data": { "to": "0x0202020202020202020202020202020202020202", "data": "0x095ea7b3", "value": "0", "chainId": 8453 } }
                ]},
                { "id": "deposit", "kind": "transaction", "requestId": "0xreq", "items": [
                    { "status": "incomplete", "data": { "to": "0xa5f565650890fba1824ee0f21ebbbf660a179934", "data": "0x00", "value": 12, "chainId": 8453 } }
                ]}
            ],
            "details": { "timeEstimate": 4, "currencyOut": { "amount": "1500000000000000" } }
        }))
        .unwrap();
        let quote = normalize_quote(raw, &request(), Address::repeat_byte(0x06)).unwrap();
        assert_eq!(quote.steps.len(), 2);
        assert_eq!(quote.request_id.as_deref(), Some("0xreq"));
        assert_eq!(quote.time_estimate_secs, Some(4));
        assert_eq!(quote.expected_out, Some(U256::from(1_500_000_000_000_000u64)));
        assert_eq!(quote.deposit_tx().unwrap().value, U256::from(12u64));
        assert_eq!(quote.destination_currency, Address::repeat_byte(0x06));
    }

    #[test]
    fn items_without_tx_data_are_dropped() {
        let raw: RelayQuoteResponse = serde_json::from_value(serde_json::json!({
            "steps": [ { "id": "deposit", "items": [ { "status": "incomplete" } ] } ]
        }))
        .unwrap();
        let quote = normalize_quote(raw, &request(), Address::zero()).unwrap();
        assert!(matches!(quote.deposit_tx(), Err(BotError::MalformedQuote(_))));
    }

    #[test]
    fn value_parsing_accepts_strings_hex_and_numbers() {
        assert_eq!(parse_value(&None).unwrap(), U256::zero());
        assert_eq!(parse_value(&Some(serde_json::json!("1000"))).unwrap(), U256::from(1000));
        assert_eq!(parse_value(&Some(serde_json::json!("0x10"))).unwrap(), U256::from(16));
        assert_eq!(parse_value(&Some(serde_json::json!(7))).unwrap(), U256::from(7));
        assert!(parse_value(&Some(serde_json::json!("abc"))).is_err());
    }
}
