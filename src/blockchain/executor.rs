//! Write path shared by every on-chain operation.
//!
//! Each submission fetches a fresh gas price and refuses to send when it is
//! above the configured ceiling. Nothing here retries; callers decide.

use std::sync::Arc;

use ethers::types::{Address, Bytes, U256};
use tracing::{debug, info, warn};

use super::chains::NATIVE_TOKEN_ADDRESS;
use super::traits::{ChainAccess, TxPayload, TxReceipt};
use crate::core::abi;
use crate::core::domain::PrivateKey;
use crate::core::errors::BotError;

/// Percent added on top of `eth_estimateGas`.
pub const GAS_LIMIT_MARGIN_PERCENT: u64 = 20;

/// Apply the fixed +20% margin to an estimate.
pub fn with_gas_margin(estimate: U256) -> U256 {
    estimate.saturating_mul(U256::from(100 + GAS_LIMIT_MARGIN_PERCENT)) / U256::from(100u64)
}

#[derive(Clone)]
pub struct TxExecutor {
    chain: Arc<dyn ChainAccess>,
    gas_price_ceiling: U256,
}

impl TxExecutor {
    pub fn new(chain: Arc<dyn ChainAccess>, gas_price_ceiling: U256) -> Self {
        Self { chain, gas_price_ceiling }
    }

    pub fn chain(&self) -> &Arc<dyn ChainAccess> {
        &self.chain
    }

    pub fn gas_price_ceiling(&self) -> U256 {
        self.gas_price_ceiling
    }

    /// Fail with `GasPriceTooHigh` unless the live price on `chain_id` is within the ceiling.
    pub async fn check_gas_price(&self, chain_id: u64) -> Result<U256, BotError> {
        let price = self.chain.gas_price(chain_id).await?;
        if price > self.gas_price_ceiling {
            warn!(chain_id, %price, ceiling = %self.gas_price_ceiling, "Gas price above ceiling");
            return Err(BotError::GasPriceTooHigh {
                chain_id,
                price,
                ceiling: self.gas_price_ceiling,
            });
        }
        Ok(price)
    }

    /// Gas check, value check, gas limit, sign, send, await receipt. A reverted
    /// receipt is an error.
    pub async fn submit(
        &self,
        key: &PrivateKey,
        payload: &TxPayload,
        gas_limit: Option<U256>,
    ) -> Result<TxReceipt, BotError> {
        self.check_gas_price(payload.chain_id).await?;
        let from = key.address()?;

        if !payload.value.is_zero() {
            let balance = self.chain.native_balance(payload.chain_id, from).await?;
            if balance < payload.value {
                warn!(chain_id = payload.chain_id, %balance, value = %payload.value, "Value exceeds native balance");
                return Err(BotError::InsufficientFunds(format!(
                    "{:?} holds {} wei on chain {}, transaction sends {}",
                    from, balance, payload.chain_id, payload.value
                )));
            }
        }

        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = self.chain.estimate_gas(from, payload).await?;
                debug!(chain_id = payload.chain_id, %estimate, "Gas estimated");
                with_gas_margin(estimate)
            }
        };

        let receipt = self.chain.send_transaction(key, payload, gas_limit).await?;
        if !receipt.success {
            return Err(BotError::TransactionFailed(format!(
                "Transaction {:?} reverted on chain {}",
                receipt.tx_hash, payload.chain_id
            )));
        }
        info!(chain_id = payload.chain_id, tx_hash = ?receipt.tx_hash, "Transaction confirmed");
        Ok(receipt)
    }

    /// Approve `spender` for the maximum amount when the current allowance is zero.
    ///
    /// Any non-zero allowance counts as sufficient. Returns the receipt when an
    /// approval was sent.
    pub async fn approve_if_unset(
        &self,
        key: &PrivateKey,
        chain_id: u64,
        token: Address,
        spender: Address,
    ) -> Result<Option<TxReceipt>, BotError> {
        if token == NATIVE_TOKEN_ADDRESS {
            return Ok(None);
        }
        let owner = key.address()?;
        let current = self.chain.allowance(chain_id, token, owner, spender).await?;
        if !current.is_zero() {
            debug!(chain_id, ?token, ?spender, "Allowance already set");
            return Ok(None);
        }
        info!(chain_id, ?token, ?spender, "Approving spender");
        let payload = TxPayload {
            chain_id,
            to: token,
            data: abi::encode_approve(spender, U256::MAX),
            value: U256::zero(),
        };
        self.submit(key, &payload, None).await.map(Some)
    }

    /// Wrap `amount` of native currency through the WETH `deposit()` call.
    pub async fn wrap_native(
        &self,
        key: &PrivateKey,
        chain_id: u64,
        weth: Address,
        amount: U256,
    ) -> Result<TxReceipt, BotError> {
        let payload = TxPayload { chain_id, to: weth, data: abi::encode_weth_deposit(), value: amount };
        self.submit(key, &payload, None).await
    }

    pub async fn transfer_token(
        &self,
        key: &PrivateKey,
        chain_id: u64,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, BotError> {
        let payload = TxPayload {
            chain_id,
            to: token,
            data: abi::encode_transfer(to, amount),
            value: U256::zero(),
        };
        self.submit(key, &payload, None).await
    }

    pub async fn transfer_native(
        &self,
        key: &PrivateKey,
        chain_id: u64,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, BotError> {
        let payload = TxPayload { chain_id, to, data: Bytes::new(), value: amount };
        self.submit(key, &payload, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    const BASE: u64 = 8453;

    fn setup() -> (Arc<MockChain>, TxExecutor, PrivateKey) {
        let chain = MockChain::new();
        let executor = TxExecutor::new(chain.clone() as Arc<dyn ChainAccess>, U256::from(100_000_000u64));
        (chain, executor, PrivateKey::new([0x11; 32]))
    }

    #[test]
    fn gas_margin_adds_twenty_percent() {
        assert_eq!(with_gas_margin(U256::from(100_000u64)), U256::from(120_000u64));
        assert_eq!(with_gas_margin(U256::from(21_000u64)), U256::from(25_200u64));
        assert_eq!(with_gas_margin(U256::zero()), U256::zero());
    }

    #[tokio::test]
    async fn value_above_native_balance_is_insufficient_funds() {
        let (chain, executor, key) = setup();
        let owner = key.address().unwrap();
        chain.set_native(BASE, owner, U256::from(5u64));

        let err = executor
            .transfer_native(&key, BASE, Address::repeat_byte(4), U256::from(6u64))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::InsufficientFunds(_)), "{:?}", err);
        assert!(err.is_skippable());
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn value_equal_to_balance_is_sent() {
        let (chain, executor, key) = setup();
        let owner = key.address().unwrap();
        chain.set_native(BASE, owner, U256::from(6u64));

        executor.transfer_native(&key, BASE, Address::repeat_byte(4), U256::from(6u64)).await.unwrap();
        assert_eq!(chain.sent().len(), 1);
    }

    #[tokio::test]
    async fn zero_value_calls_need_no_native_balance() {
        let (_chain, executor, key) = setup();
        let receipt = executor
            .transfer_token(&key, BASE, Address::repeat_byte(9), Address::repeat_byte(4), U256::one())
            .await
            .unwrap();
        assert!(receipt.success);
    }
}
