use std::collections::BTreeMap;
use std::sync::Arc;

use ethers::types::Address;
use tracing::{debug, warn};

use super::chains::{ChainDescriptor, ChainRegistry};
use super::traits::ChainAccess;
use crate::core::domain::{AccountBalanceSnapshot, ChainBalances, TokenBalance, TokenSymbol};
use crate::core::errors::BotError;

const NATIVE_DECIMALS: u8 = 18;

/// Reads native and tracked-token balances on every supported chain.
///
/// Reads are isolated: a failing endpoint or token contract only marks the
/// affected entries as unavailable. Nothing is retried here.
#[derive(Clone)]
pub struct BalanceReader {
    chain: Arc<dyn ChainAccess>,
    registry: Arc<ChainRegistry>,
}

impl BalanceReader {
    pub fn new(chain: Arc<dyn ChainAccess>, registry: Arc<ChainRegistry>) -> Self {
        Self { chain, registry }
    }

    pub async fn snapshot(&self, address: Address) -> AccountBalanceSnapshot {
        let mut chains = BTreeMap::new();
        for descriptor in self.registry.iter() {
            chains.insert(descriptor.chain_id, self.read_chain(descriptor, address).await);
        }
        AccountBalanceSnapshot { address, chains }
    }

    async fn read_chain(&self, descriptor: &ChainDescriptor, owner: Address) -> ChainBalances {
        let chain_id = descriptor.chain_id;
        let native = match self.chain.native_balance(chain_id, owner).await {
            Ok(raw) => TokenBalance::available(descriptor.native_symbol, owner, chain_id, raw, NATIVE_DECIMALS),
            Err(e) => {
                warn!(chain_id, "Native balance unavailable on {}: {}", descriptor.name, e);
                TokenBalance::unavailable(descriptor.native_symbol, owner, chain_id, e.to_string())
            }
        };

        let mut tokens = BTreeMap::new();
        for symbol in TokenSymbol::TRACKED {
            let entry = match descriptor.tokens.get(&symbol) {
                Some(token) => match self.read_token(chain_id, *token, owner).await {
                    Ok((raw, decimals)) => {
                        TokenBalance::available(symbol, owner, chain_id, raw, decimals)
                    }
                    Err(e) => {
                        warn!(chain_id, %symbol, "Token balance unavailable: {}", e);
                        TokenBalance::unavailable(symbol, owner, chain_id, e.to_string())
                    }
                },
                None => TokenBalance::unavailable(symbol, owner, chain_id, "token not tracked"),
            };
            debug!(chain_id, %symbol, balance = %entry.formatted, "Balance read");
            tokens.insert(symbol, entry);
        }

        ChainBalances { native, tokens }
    }

    async fn read_token(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<(ethers::types::U256, u8), BotError> {
        let raw = self.chain.token_balance(chain_id, token, owner).await?;
        let decimals = self.chain.token_decimals(chain_id, token).await?;
        Ok((raw, decimals))
    }
}
