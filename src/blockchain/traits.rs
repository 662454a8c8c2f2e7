use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

use crate::core::domain::PrivateKey;
use crate::core::errors::BotError;

/// An executable transaction: target, calldata and value on a given chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    pub chain_id: u64,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub success: bool,
    pub gas_used: Option<U256>,
}

/// Read and write access to the supported EVM chains.
///
/// Every method names the chain explicitly; implementations route to the
/// matching RPC endpoint. Writes block until the receipt is available.
#[async_trait]
pub trait ChainAccess: Send + Sync {
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, BotError>;

    async fn token_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<U256, BotError>;

    async fn token_decimals(&self, chain_id: u64, token: Address) -> Result<u8, BotError>;

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, BotError>;

    async fn gas_price(&self, chain_id: u64) -> Result<U256, BotError>;

    async fn estimate_gas(&self, from: Address, payload: &TxPayload) -> Result<U256, BotError>;

    /// Sign with `key`, broadcast and wait for the receipt.
    async fn send_transaction(
        &self,
        key: &PrivateKey,
        payload: &TxPayload,
        gas_limit: U256,
    ) -> Result<TxReceipt, BotError>;
}
