//! Wiring of the production collaborators from a `BotConfig`.

use std::sync::Arc;
use std::time::Duration;

use secrecy::Secret;

use crate::api::bridge::{BridgeApi, RelayClient};
use crate::api::swap::{OneInchClient, SwapApi};
use crate::blockchain::balance::BalanceReader;
use crate::blockchain::chains::ChainRegistry;
use crate::blockchain::ethereum::RpcChainAccess;
use crate::blockchain::executor::TxExecutor;
use crate::blockchain::traits::ChainAccess;
use crate::core::config::BotConfig;
use crate::core::errors::BotError;
use crate::orchestrator::{CycleRunner, GasGuard, Sleeper, TokioSleeper};

/// Shared handles every command needs. The swap client is built separately
/// because only trading commands require its credential.
pub struct BotServices {
    pub config: BotConfig,
    pub registry: Arc<ChainRegistry>,
    pub chain: Arc<dyn ChainAccess>,
    pub bridge: Arc<dyn BridgeApi>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl BotServices {
    pub fn connect(config: BotConfig) -> Result<Self, BotError> {
        let registry = Arc::new(ChainRegistry::from_config(&config)?);
        let chain: Arc<dyn ChainAccess> =
            Arc::new(RpcChainAccess::from_registry(&registry, config.confirmation_timeout())?);
        let bridge: Arc<dyn BridgeApi> = Arc::new(RelayClient::new(
            config.bridge_api_url.clone(),
            registry.clone(),
            config.bridge_slippage_bps(),
            config.referrer.clone(),
        ));
        Ok(Self::new(config, registry, chain, bridge, Arc::new(TokioSleeper)))
    }

    pub fn new(
        config: BotConfig,
        registry: Arc<ChainRegistry>,
        chain: Arc<dyn ChainAccess>,
        bridge: Arc<dyn BridgeApi>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self { config, registry, chain, bridge, sleeper }
    }

    pub fn executor(&self) -> TxExecutor {
        TxExecutor::new(self.chain.clone(), self.config.gas_price_ceiling_wei())
    }

    pub fn balance_reader(&self) -> BalanceReader {
        BalanceReader::new(self.chain.clone(), self.registry.clone())
    }

    pub fn cycle_runner(&self, swap: Arc<dyn SwapApi>) -> CycleRunner {
        let gas_guard = GasGuard::new(
            self.executor(),
            self.bridge.clone(),
            self.registry.clone(),
            self.sleeper.clone(),
            self.config.reserve_chain_id,
            Duration::from_secs(self.config.rescue_wait_secs),
        );
        CycleRunner::new(
            self.registry.clone(),
            self.executor(),
            swap,
            self.bridge.clone(),
            gas_guard,
            self.config.slippage_tolerance,
            self.config.bridge_fraction_percent,
        )
    }
}

/// 1inch client from config; fails when `SWAP_API_KEY` is missing.
pub fn swap_client(config: &BotConfig) -> Result<Arc<dyn SwapApi>, BotError> {
    let key = config.require_swap_api_key()?;
    let client = OneInchClient::new(config.swap_api_url.clone(), Secret::new(key.to_string()))
        .with_fee(config.swap_fee_percent, config.referrer.clone());
    Ok(Arc::new(client))
}
