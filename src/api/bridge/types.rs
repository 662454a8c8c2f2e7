//! Bridge aggregator data types

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::Serialize;

use crate::blockchain::traits::TxPayload;
use crate::core::domain::TokenSymbol;
use crate::core::errors::BotError;

/// Step id that carries the funds-moving transaction.
pub const DEPOSIT_STEP_ID: &str = "deposit";

/// How the destination currency of a bridge quote is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationCurrency {
    /// The destination chain's native gas currency.
    Native,
    /// A tracked symbol resolved against the destination chain.
    Symbol(TokenSymbol),
    /// Same symbol as the origin currency.
    SameAsOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeQuoteRequest {
    pub user: Address,
    pub recipient: Address,
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    pub origin_currency: Address,
    pub origin_symbol: TokenSymbol,
    pub destination: DestinationCurrency,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeStepItem {
    pub status: Option<String>,
    pub tx: TxPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeStep {
    pub id: String,
    pub request_id: Option<String>,
    pub items: Vec<BridgeStepItem>,
}

/// Normalized bridge quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeQuote {
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    pub origin_currency: Address,
    pub destination_currency: Address,
    pub amount: U256,
    pub expected_out: Option<U256>,
    pub steps: Vec<BridgeStep>,
    pub request_id: Option<String>,
    pub time_estimate_secs: Option<u64>,
}

impl BridgeQuote {
    /// First item of the `deposit` step. Missing step or empty items is `MalformedQuote`.
    pub fn deposit_tx(&self) -> Result<&TxPayload, BotError> {
        let step = self
            .steps
            .iter()
            .find(|s| s.id == DEPOSIT_STEP_ID)
            .ok_or_else(|| BotError::MalformedQuote("quote has no deposit step".to_string()))?;
        step.items
            .first()
            .map(|item| &item.tx)
            .ok_or_else(|| BotError::MalformedQuote("deposit step has no items".to_string()))
    }

    /// Request id of the deposit step, falling back to the quote-level id.
    pub fn deposit_request_id(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.id == DEPOSIT_STEP_ID)
            .and_then(|s| s.request_id.as_deref())
            .or(self.request_id.as_deref())
    }
}

/// Latest status of a bridge request. The status string is provider-defined
/// and passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeStatus {
    pub request_id: String,
    pub status: String,
}

impl BridgeStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self.status.to_lowercase().as_str(), "completed" | "success")
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status.to_lowercase().as_str(), "failure" | "failed" | "refund" | "refunded")
    }

    /// Anything not known to be terminal counts as in flight.
    pub fn is_pending(&self) -> bool {
        !self.is_completed() && !self.is_failed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeExecution {
    pub tx_hash: H256,
    pub request_id: String,
    /// Chain the deposit actually ran on, taken from the quote payload.
    pub chain_id: u64,
}

#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn quote(&self, request: &BridgeQuoteRequest) -> Result<BridgeQuote, BotError>;

    async fn status(&self, request_id: &str) -> Result<BridgeStatus, BotError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Bytes;

    fn item(chain_id: u64) -> BridgeStepItem {
        BridgeStepItem {
            status: Some("incomplete".to_string()),
            tx: TxPayload {
                chain_id,
                to: Address::repeat_byte(9),
                data: Bytes::new(),
                value: U256::zero(),
            },
        }
    }

    fn quote(steps: Vec<BridgeStep>) -> BridgeQuote {
        BridgeQuote {
            origin_chain_id: 10,
            destination_chain_id: 8453,
            origin_currency: Address::zero(),
            destination_currency: Address::zero(),
            amount: U256::one(),
            expected_out: None,
            steps,
            request_id: None,
            time_estimate_secs: None,
        }
    }

    #[test]
    fn deposit_tx_picks_deposit_step() {
        let q = quote(vec![
            BridgeStep { id: "approve".into(), request_id: None, items: vec![item(1)] },
            BridgeStep { id: "deposit".into(), request_id: Some("0xabc".into()), items: vec![item(42161), item(2)] },
        ]);
        assert_eq!(q.deposit_tx().unwrap().chain_id, 42161);
        assert_eq!(q.deposit_request_id(), Some("0xabc"));
    }

    #[test]
    fn missing_deposit_step_is_malformed() {
        let q = quote(vec![BridgeStep { id: "approve".into(), request_id: None, items: vec![item(1)] }]);
        assert!(matches!(q.deposit_tx(), Err(BotError::MalformedQuote(_))));
    }

    #[test]
    fn empty_deposit_items_is_malformed() {
        let q = quote(vec![BridgeStep { id: "deposit".into(), request_id: None, items: vec![] }]);
        assert!(matches!(q.deposit_tx(), Err(BotError::MalformedQuote(_))));
    }

    #[test]
    fn status_classification() {
        let s = |v: &str| BridgeStatus { request_id: "r".into(), status: v.into() };
        assert!(s("completed").is_completed());
        assert!(s("success").is_completed());
        assert!(s("pending").is_pending());
        assert!(s("created").is_pending());
        assert!(s("waiting").is_pending());
        assert!(s("refund").is_failed());
        assert!(!s("refund").is_pending());
    }
}
