//! Static registry of the four supported networks.

use std::collections::BTreeMap;

use ethers::types::Address;

use crate::core::config::BotConfig;
use crate::core::domain::TokenSymbol;
use crate::core::errors::BotError;

pub const ARBITRUM: u64 = 42161;
pub const OPTIMISM: u64 = 10;
pub const BASE: u64 = 8453;
pub const LINEA: u64 = 59144;

pub const SUPPORTED_CHAIN_IDS: [u64; 4] = [ARBITRUM, OPTIMISM, BASE, LINEA];

/// Placeholder the bridge API uses for the native gas currency.
pub const NATIVE_TOKEN_ADDRESS: Address = Address::zero();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub tokens: BTreeMap<TokenSymbol, Address>,
    pub native_symbol: TokenSymbol,
}

impl ChainDescriptor {
    /// Address of `symbol` on this chain; the native symbol resolves to the zero placeholder.
    pub fn token_address(&self, symbol: TokenSymbol) -> Result<Address, BotError> {
        if symbol == self.native_symbol {
            return Ok(NATIVE_TOKEN_ADDRESS);
        }
        self.tokens.get(&symbol).copied().ok_or_else(|| {
            BotError::Validation(format!("{} is not tracked on chain {}", symbol, self.chain_id))
        })
    }

    /// Reverse lookup used to name tokens returned by upstream APIs.
    pub fn symbol_for(&self, address: Address) -> Option<TokenSymbol> {
        if address == NATIVE_TOKEN_ADDRESS {
            return Some(self.native_symbol);
        }
        self.tokens.iter().find(|(_, a)| **a == address).map(|(s, _)| *s)
    }
}

#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainDescriptor>,
}

impl ChainRegistry {
    /// Build the registry with the RPC endpoints from `config`.
    pub fn from_config(config: &BotConfig) -> Result<Self, BotError> {
        let mut chains = BTreeMap::new();
        for chain_id in SUPPORTED_CHAIN_IDS {
            let rpc_url = config
                .rpc_urls
                .get(&chain_id)
                .cloned()
                .ok_or_else(|| BotError::Config(format!("Missing RPC URL for chain {}", chain_id)))?;
            chains.insert(chain_id, builtin_descriptor(chain_id, rpc_url)?);
        }
        Ok(Self { chains })
    }

    pub fn describe(&self, chain_id: u64) -> Result<&ChainDescriptor, BotError> {
        self.chains.get(&chain_id).ok_or(BotError::UnknownChain(chain_id))
    }

    /// All supported chain ids in ascending order.
    pub fn all_chain_ids(&self) -> Vec<u64> {
        self.chains.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        // default config always carries every supported RPC URL
        Self::from_config(&BotConfig::default()).unwrap_or(Self { chains: BTreeMap::new() })
    }
}

fn addr(s: &str) -> Address {
    s.parse().unwrap_or_default()
}

fn builtin_descriptor(chain_id: u64, rpc_url: String) -> Result<ChainDescriptor, BotError> {
    let (name, weth, usdc) = match chain_id {
        ARBITRUM => (
            "Arbitrum One",
            "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
            "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
        ),
        OPTIMISM => (
            "OP Mainnet",
            "0x4200000000000000000000000000000000000006",
            "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",
        ),
        BASE => (
            "Base",
            "0x4200000000000000000000000000000000000006",
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        ),
        LINEA => (
            "Linea",
            "0xe5D7C2a44FfDDf6b295A15c148167daaAf5Cf34f",
            "0x176211869cA2b568f2A7D4EE941E073a821EE1ff",
        ),
        other => return Err(BotError::UnknownChain(other)),
    };

    let mut tokens = BTreeMap::new();
    tokens.insert(TokenSymbol::Weth, addr(weth));
    tokens.insert(TokenSymbol::Usdc, addr(usdc));

    Ok(ChainDescriptor {
        chain_id,
        name: name.to_string(),
        rpc_url,
        tokens,
        native_symbol: TokenSymbol::Eth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_exactly_four_chains() {
        let registry = ChainRegistry::default();
        assert_eq!(registry.all_chain_ids(), vec![OPTIMISM, BASE, ARBITRUM, LINEA]);
    }

    #[test]
    fn unknown_chain_is_an_error() {
        let registry = ChainRegistry::default();
        assert!(matches!(registry.describe(1), Err(BotError::UnknownChain(1))));
    }

    #[test]
    fn token_addresses_resolve() {
        let registry = ChainRegistry::default();
        let base = registry.describe(BASE).unwrap();
        assert_eq!(
            base.token_address(TokenSymbol::Usdc).unwrap(),
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse::<Address>().unwrap()
        );
        assert_eq!(base.token_address(TokenSymbol::Eth).unwrap(), NATIVE_TOKEN_ADDRESS);
        assert_eq!(base.symbol_for(base.tokens[&TokenSymbol::Weth]), Some(TokenSymbol::Weth));
        assert_eq!(base.symbol_for(Address::repeat_byte(0x42)), None);
    }

    #[test]
    fn rpc_urls_come_from_config() {
        let mut cfg = BotConfig::default();
        cfg.rpc_urls.insert(LINEA, "http://linea.local".to_string());
        let registry = ChainRegistry::from_config(&cfg).unwrap();
        assert_eq!(registry.describe(LINEA).unwrap().rpc_url, "http://linea.local");
    }
}
