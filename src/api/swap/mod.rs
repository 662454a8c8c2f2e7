//! DEX aggregator swaps
//!
//! Quotes come from the 1inch Swap API; execution goes through the shared
//! `TxExecutor` so the gas ceiling applies.

pub mod oneinch;
pub mod types;

pub use oneinch::OneInchClient;
pub use types::*;

use ethers::types::U256;
use tracing::info;

use crate::blockchain::executor::TxExecutor;
use crate::core::domain::PrivateKey;
use crate::core::errors::BotError;

/// Submit a quoted swap. Without `gas_limit` the executor estimates and adds 20%.
pub async fn execute_swap(
    executor: &TxExecutor,
    key: &PrivateKey,
    quote: &SwapQuote,
    gas_limit: Option<U256>,
) -> Result<SwapOutcome, BotError> {
    info!(
        chain_id = quote.chain_id,
        "Swapping {} {} -> {} (expected {})",
        quote.amount_in,
        quote.src_symbol,
        quote.dst_symbol,
        quote.expected_out
    );
    let receipt = executor.submit(key, &quote.tx, gas_limit).await?;
    Ok(SwapOutcome {
        tx_hash: receipt.tx_hash,
        output_amount: quote.expected_out,
        output_token: quote.dst_token,
        output_symbol: quote.dst_symbol,
    })
}
