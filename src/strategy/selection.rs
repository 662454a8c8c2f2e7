//! Token-selection policy
//!
//! Pure functions over a balance snapshot. WETH always outranks USDC: a
//! qualifying WETH balance anywhere wins over any USDC balance, whatever the
//! relative sizes. Within one symbol the largest balance wins.

use ethers::types::U256;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::blockchain::chains::ChainRegistry;
use crate::core::domain::{AccountBalanceSnapshot, BridgeCandidate, TokenSymbol};
use crate::core::errors::BotError;

/// 0.001 WETH
pub const WETH_MIN_BALANCE: U256 = U256([1_000_000_000_000_000, 0, 0, 0]);
/// 1.0 USDC at 6 decimals
pub const USDC_MIN_BALANCE: U256 = U256([1_000_000, 0, 0, 0]);

/// Smallest raw balance of `symbol` worth moving.
pub fn min_balance(symbol: TokenSymbol) -> U256 {
    match symbol {
        TokenSymbol::Weth => WETH_MIN_BALANCE,
        TokenSymbol::Usdc => USDC_MIN_BALANCE,
        TokenSymbol::Eth => U256::MAX,
    }
}

/// Pick the token to move next, or `None` when nothing clears its threshold.
///
/// Failed reads never qualify. Equal balances keep the first chain in
/// ascending chain-id order.
pub fn select_candidate(
    snapshot: &AccountBalanceSnapshot,
    registry: &ChainRegistry,
) -> Option<BridgeCandidate> {
    for symbol in TokenSymbol::TRACKED {
        let threshold = min_balance(symbol);
        let mut best: Option<BridgeCandidate> = None;

        for (chain_id, balances) in &snapshot.chains {
            let Some(amount) = balances.tokens.get(&symbol).and_then(|b| b.amount()) else {
                continue;
            };
            if amount < threshold {
                continue;
            }
            if best.as_ref().is_some_and(|b| amount <= b.amount) {
                continue;
            }
            let Ok(token_address) = registry.describe(*chain_id).and_then(|d| d.token_address(symbol))
            else {
                continue;
            };
            best = Some(BridgeCandidate {
                symbol,
                chain_id: *chain_id,
                token_address,
                amount,
                target_symbol: symbol.opposite(),
            });
        }

        if let Some(candidate) = best {
            debug!(chain_id = candidate.chain_id, symbol = %candidate.symbol, amount = %candidate.amount, "Candidate selected");
            return Some(candidate);
        }
    }
    None
}

/// Uniformly random supported chain other than `source_chain_id`.
pub fn pick_destination<R: Rng + ?Sized>(
    rng: &mut R,
    registry: &ChainRegistry,
    source_chain_id: u64,
) -> Result<u64, BotError> {
    let choices: Vec<u64> =
        registry.all_chain_ids().into_iter().filter(|id| *id != source_chain_id).collect();
    choices
        .choose(rng)
        .copied()
        .ok_or_else(|| BotError::Validation(format!("No destination other than {}", source_chain_id)))
}
