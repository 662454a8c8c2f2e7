//! Gas-sufficiency guard
//!
//! Before spending on a chain the wallet must hold a minimum of native gas.
//! When it does not, a fixed amount is wrapped on the reserve chain and
//! bridged over as native currency. The guard checks the rescue status once
//! after a fixed wait and never blocks beyond that.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::{Address, U256};
use tracing::{info, warn};

use super::scheduler::Sleeper;
use crate::api::bridge::{
    execute_bridge, BridgeApi, BridgeQuoteRequest, BridgeStatus, DestinationCurrency,
};
use crate::blockchain::chains::ChainRegistry;
use crate::blockchain::executor::TxExecutor;
use crate::blockchain::traits::ChainAccess;
use crate::core::domain::{PrivateKey, TokenSymbol};
use crate::core::errors::BotError;

/// 0.0005 ETH
pub const MIN_NATIVE_BALANCE: U256 = U256([500_000_000_000_000, 0, 0, 0]);
/// 0.001 ETH
pub const RESCUE_AMOUNT: U256 = U256([1_000_000_000_000_000, 0, 0, 0]);
/// Headroom the reserve chain keeps for its own fees during a rescue.
pub const RESCUE_FEE_BUFFER: U256 = U256([500_000_000_000_000, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasStatus {
    /// Balance already at or above the minimum.
    Sufficient,
    /// A rescue bridge was sent and was not reported failed.
    Rescued { request_id: String, status: String },
    Insufficient { reason: String },
}

impl GasStatus {
    pub fn is_ok(&self) -> bool {
        !matches!(self, GasStatus::Insufficient { .. })
    }
}

pub struct GasGuard {
    chain: Arc<dyn ChainAccess>,
    executor: TxExecutor,
    bridge: Arc<dyn BridgeApi>,
    registry: Arc<ChainRegistry>,
    sleeper: Arc<dyn Sleeper>,
    reserve_chain_id: u64,
    rescue_wait: Duration,
}

impl GasGuard {
    pub fn new(
        executor: TxExecutor,
        bridge: Arc<dyn BridgeApi>,
        registry: Arc<ChainRegistry>,
        sleeper: Arc<dyn Sleeper>,
        reserve_chain_id: u64,
        rescue_wait: Duration,
    ) -> Self {
        Self {
            chain: executor.chain().clone(),
            executor,
            bridge,
            registry,
            sleeper,
            reserve_chain_id,
            rescue_wait,
        }
    }

    /// Make sure `key` can pay for transactions on `chain_id`.
    ///
    /// Errors are only returned when the target balance cannot be read or
    /// when the gas ceiling blocks the rescue; everything else that goes
    /// wrong during a rescue is reported as `Insufficient`.
    pub async fn ensure_gas(&self, key: &PrivateKey, chain_id: u64) -> Result<GasStatus, BotError> {
        let owner = key.address()?;
        let balance = self.chain.native_balance(chain_id, owner).await?;
        if balance >= MIN_NATIVE_BALANCE {
            return Ok(GasStatus::Sufficient);
        }
        warn!(chain_id, address = ?owner, %balance, "Native gas below minimum");

        if chain_id == self.reserve_chain_id {
            return Ok(GasStatus::Insufficient {
                reason: format!("chain {} is the reserve chain and cannot rescue itself", chain_id),
            });
        }

        let reserve_balance = self.chain.native_balance(self.reserve_chain_id, owner).await?;
        let required = RESCUE_AMOUNT + RESCUE_FEE_BUFFER;
        if reserve_balance < required {
            return Ok(GasStatus::Insufficient {
                reason: format!(
                    "reserve chain {} holds {} wei, rescue needs {}",
                    self.reserve_chain_id, reserve_balance, required
                ),
            });
        }

        match self.rescue(key, owner, chain_id).await {
            Ok(status) => Ok(status),
            Err(e) if matches!(e, BotError::GasPriceTooHigh { .. }) => Err(e),
            Err(e) => {
                warn!(chain_id, "Gas rescue failed: {}", e);
                Ok(GasStatus::Insufficient { reason: format!("gas rescue failed: {}", e) })
            }
        }
    }

    async fn rescue(&self, key: &PrivateKey, owner: Address, chain_id: u64) -> Result<GasStatus, BotError> {
        let reserve = self.reserve_chain_id;
        let weth = self.registry.describe(reserve)?.token_address(TokenSymbol::Weth)?;

        info!(reserve, chain_id, amount = %RESCUE_AMOUNT, "Starting gas rescue");
        self.executor.wrap_native(key, reserve, weth, RESCUE_AMOUNT).await?;

        let request = BridgeQuoteRequest {
            user: owner,
            recipient: owner,
            origin_chain_id: reserve,
            destination_chain_id: chain_id,
            origin_currency: weth,
            origin_symbol: TokenSymbol::Weth,
            destination: DestinationCurrency::Native,
            amount: RESCUE_AMOUNT,
        };
        let quote = self.bridge.quote(&request).await?;
        let deposit = quote.deposit_tx()?;
        self.executor.approve_if_unset(key, deposit.chain_id, weth, deposit.to).await?;
        let execution = execute_bridge(&self.executor, key, &quote).await?;

        self.sleeper.sleep(self.rescue_wait).await;

        let status = match self.bridge.status(&execution.request_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(request_id = %execution.request_id, "Rescue status unavailable: {}", e);
                BridgeStatus { request_id: execution.request_id.clone(), status: "unknown".to_string() }
            }
        };
        if status.is_failed() {
            return Ok(GasStatus::Insufficient {
                reason: format!("gas rescue {} ended as {}", status.request_id, status.status),
            });
        }
        info!(chain_id, request_id = %status.request_id, status = %status.status, "Gas rescue sent");
        Ok(GasStatus::Rescued { request_id: status.request_id, status: status.status })
    }
}
