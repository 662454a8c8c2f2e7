// tests/util.rs
// Shared helpers for the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge_cycler::api::bridge::BridgeApi;
use bridge_cycler::blockchain::chains::{ChainRegistry, SUPPORTED_CHAIN_IDS};
use bridge_cycler::blockchain::traits::ChainAccess;
use bridge_cycler::core::config::BotConfig;
use bridge_cycler::core::domain::{
    AccountBalanceSnapshot, ChainBalances, PrivateKey, TokenBalance, TokenSymbol,
};
use bridge_cycler::core::wallet_store::WalletRecord;
use bridge_cycler::orchestrator::{CycleRunner, Sleeper};
use bridge_cycler::service::BotServices;
use bridge_cycler::testing::{MockBridgeApi, MockChain, MockSwapApi, RecordingSleeper};
use ethers::types::{Address, U256};

pub const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

/// A second, unrelated test key.
pub const KEY_2: &str = "0x8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";

pub fn address() -> Address {
    ADDRESS.parse().unwrap()
}

pub fn wallet() -> WalletRecord {
    wallet_from(KEY)
}

pub fn wallet_from(key: &str) -> WalletRecord {
    let key = PrivateKey::from_hex(key).unwrap();
    WalletRecord { address: key.address().unwrap(), key, active: true }
}

/// 10^exp
pub fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

pub fn eth(milli: u64) -> U256 {
    U256::from(milli) * pow10(15)
}

pub fn usdc(units: u64) -> U256 {
    U256::from(units) * pow10(6)
}

pub fn token(registry: &ChainRegistry, chain_id: u64, symbol: TokenSymbol) -> Address {
    registry.describe(chain_id).unwrap().token_address(symbol).unwrap()
}

/// Snapshot with zero balances everywhere except `entries`.
pub fn snapshot(owner: Address, entries: &[(u64, TokenSymbol, U256)]) -> AccountBalanceSnapshot {
    let mut chains = BTreeMap::new();
    for chain_id in SUPPORTED_CHAIN_IDS {
        let mut tokens = BTreeMap::new();
        for symbol in TokenSymbol::TRACKED {
            let decimals = if symbol == TokenSymbol::Usdc { 6 } else { 18 };
            tokens.insert(symbol, TokenBalance::available(symbol, owner, chain_id, U256::zero(), decimals));
        }
        let native = TokenBalance::available(TokenSymbol::Eth, owner, chain_id, U256::zero(), 18);
        chains.insert(chain_id, ChainBalances { native, tokens });
    }
    for (chain_id, symbol, raw) in entries {
        let entry = chains.get_mut(chain_id).unwrap().tokens.get_mut(symbol).unwrap();
        *entry = TokenBalance::available(*symbol, owner, *chain_id, *raw, entry.decimals);
    }
    AccountBalanceSnapshot { address: owner, chains }
}

/// Mocks wired into real orchestration code.
pub struct Harness {
    pub registry: Arc<ChainRegistry>,
    pub chain: Arc<MockChain>,
    pub swap: Arc<MockSwapApi>,
    pub bridge: Arc<MockBridgeApi>,
    pub sleeper: Arc<RecordingSleeper>,
    pub services: BotServices,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(BotConfig::default())
    }

    pub fn with_config(config: BotConfig) -> Self {
        let registry = Arc::new(ChainRegistry::from_config(&config).unwrap());
        let chain = MockChain::with_registry(&registry);
        let swap = Arc::new(MockSwapApi::new().with_chain(chain.clone()));
        let bridge = Arc::new(MockBridgeApi::new(registry.clone()));
        let sleeper = RecordingSleeper::new();
        let services = BotServices::new(
            config,
            registry.clone(),
            chain.clone() as Arc<dyn ChainAccess>,
            bridge.clone() as Arc<dyn BridgeApi>,
            sleeper.clone() as Arc<dyn Sleeper>,
        );
        Self { registry, chain, swap, bridge, sleeper, services }
    }

    pub fn runner(&self) -> CycleRunner {
        self.services.cycle_runner(self.swap.clone())
    }

    pub fn token(&self, chain_id: u64, symbol: TokenSymbol) -> Address {
        token(&self.registry, chain_id, symbol)
    }

    /// Give `owner` enough native gas on every chain.
    pub fn fund_gas_everywhere(&self, owner: Address) {
        for chain_id in SUPPORTED_CHAIN_IDS {
            self.chain.set_native(chain_id, owner, eth(10));
        }
    }
}
