//! Cross-chain bridging through the Relay aggregator
//!
//! Quotes are requested from Relay, the `deposit` step's transaction is
//! submitted through `TxExecutor` and progress is read back by request id.

pub mod relay;
pub mod types;

pub use relay::RelayClient;
pub use types::*;

use ethers::types::Address;
use tracing::info;

use crate::blockchain::chains::{ChainRegistry, NATIVE_TOKEN_ADDRESS};
use crate::blockchain::executor::TxExecutor;
use crate::core::domain::PrivateKey;
use crate::core::errors::BotError;

/// Destination currency address for a quote request, resolved on the destination chain.
pub fn resolve_destination_currency(
    registry: &ChainRegistry,
    request: &BridgeQuoteRequest,
) -> Result<Address, BotError> {
    match request.destination {
        DestinationCurrency::Native => Ok(NATIVE_TOKEN_ADDRESS),
        DestinationCurrency::Symbol(symbol) => {
            registry.describe(request.destination_chain_id)?.token_address(symbol)
        }
        DestinationCurrency::SameAsOrigin => registry
            .describe(request.destination_chain_id)?
            .token_address(request.origin_symbol),
    }
}

/// Submit the deposit transaction of `quote`.
///
/// The transaction goes to the chain named in the deposit payload, not the
/// quote's nominal origin. A quote without a request id is rejected before
/// anything is signed, since the transfer could not be tracked afterwards.
pub async fn execute_bridge(
    executor: &TxExecutor,
    key: &PrivateKey,
    quote: &BridgeQuote,
) -> Result<BridgeExecution, BotError> {
    let payload = quote.deposit_tx()?;
    let request_id = quote
        .deposit_request_id()
        .ok_or_else(|| BotError::MalformedQuote("quote has no request id".to_string()))?
        .to_string();

    info!(
        chain_id = payload.chain_id,
        destination = quote.destination_chain_id,
        %request_id,
        "Submitting bridge deposit of {}",
        quote.amount
    );
    let receipt = executor.submit(key, payload, None).await?;

    Ok(BridgeExecution { tx_hash: receipt.tx_hash, request_id, chain_id: payload.chain_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::chains::{BASE, LINEA};
    use crate::core::domain::TokenSymbol;
    use ethers::types::U256;

    fn request(destination: DestinationCurrency) -> BridgeQuoteRequest {
        BridgeQuoteRequest {
            user: Address::repeat_byte(1),
            recipient: Address::repeat_byte(1),
            origin_chain_id: BASE,
            destination_chain_id: LINEA,
            origin_currency: Address::repeat_byte(2),
            origin_symbol: TokenSymbol::Usdc,
            destination,
            amount: U256::from(10u64),
        }
    }

    #[test]
    fn destination_currency_resolution() {
        let registry = ChainRegistry::default();
        let linea = registry.describe(LINEA).unwrap();

        let native = resolve_destination_currency(&registry, &request(DestinationCurrency::Native));
        assert_eq!(native.unwrap(), NATIVE_TOKEN_ADDRESS);

        let weth = resolve_destination_currency(
            &registry,
            &request(DestinationCurrency::Symbol(TokenSymbol::Weth)),
        );
        assert_eq!(weth.unwrap(), linea.token_address(TokenSymbol::Weth).unwrap());

        let same = resolve_destination_currency(&registry, &request(DestinationCurrency::SameAsOrigin));
        assert_eq!(same.unwrap(), linea.token_address(TokenSymbol::Usdc).unwrap());
    }

    #[test]
    fn unknown_destination_chain_is_rejected() {
        let registry = ChainRegistry::default();
        let mut req = request(DestinationCurrency::SameAsOrigin);
        req.destination_chain_id = 1;
        assert!(matches!(
            resolve_destination_currency(&registry, &req),
            Err(BotError::UnknownChain(1))
        ));
    }
}
