//! Swap aggregator data types

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::Serialize;

use crate::blockchain::traits::TxPayload;
use crate::core::domain::TokenSymbol;
use crate::core::errors::BotError;

/// Parameters of a single-chain swap quote.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuoteRequest {
    pub chain_id: u64,
    /// Account that signs and pays
    pub account: Address,
    pub receiver: Address,
    pub src_token: Address,
    pub src_symbol: TokenSymbol,
    pub dst_token: Address,
    pub dst_symbol: TokenSymbol,
    /// Raw amount in source-token units
    pub amount: U256,
    /// Percent
    pub slippage: f64,
}

/// Normalized executable quote. Provider field names never leak past this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapQuote {
    pub chain_id: u64,
    pub src_token: Address,
    pub src_symbol: TokenSymbol,
    pub src_decimals: Option<u8>,
    pub dst_token: Address,
    pub dst_symbol: TokenSymbol,
    pub dst_decimals: Option<u8>,
    pub amount_in: U256,
    pub expected_out: U256,
    pub tx: TxPayload,
    /// Router that must hold an allowance for `src_token`
    pub spender: Address,
}

/// Result of an executed swap.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapOutcome {
    pub tx_hash: H256,
    pub output_amount: U256,
    pub output_token: Address,
    pub output_symbol: TokenSymbol,
}

/// Quote side of the swap aggregator.
#[async_trait]
pub trait SwapApi: Send + Sync {
    async fn quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuote, BotError>;

    /// Router address that must be approved before swapping on `chain_id`.
    async fn spender(&self, chain_id: u64) -> Result<Address, BotError>;
}
