//! Fund consolidation and gas top-up across the wallet pool.

use ethers::types::{Address, H256, U256};
use tracing::{info, warn};

use crate::blockchain::chains::ChainRegistry;
use crate::blockchain::executor::TxExecutor;
use crate::core::domain::TokenSymbol;
use crate::core::errors::BotError;
use crate::core::wallet_store::{WalletRecord, WalletStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Sent(H256),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub chain_id: u64,
    pub symbol: TokenSymbol,
    pub amount: U256,
    pub status: TransferStatus,
}

impl TransferRecord {
    pub fn is_sent(&self) -> bool {
        matches!(self.status, TransferStatus::Sent(_))
    }
}

/// Move every tracked token balance of `wallets` to `to`, on one chain or all.
///
/// A failing transfer is recorded and the sweep carries on.
pub async fn consolidate(
    executor: &TxExecutor,
    registry: &ChainRegistry,
    wallets: &[&WalletRecord],
    to: Address,
    only_chain: Option<u64>,
) -> Result<Vec<TransferRecord>, BotError> {
    let chain_ids = match only_chain {
        Some(chain_id) => vec![registry.describe(chain_id)?.chain_id],
        None => registry.all_chain_ids(),
    };

    let mut records = Vec::new();
    for wallet in wallets {
        if wallet.address == to {
            continue;
        }
        for chain_id in &chain_ids {
            let descriptor = registry.describe(*chain_id)?;
            for symbol in TokenSymbol::TRACKED {
                let token = descriptor.token_address(symbol)?;
                let amount = match executor.chain().token_balance(*chain_id, token, wallet.address).await {
                    Ok(amount) => amount,
                    Err(e) => {
                        warn!(chain_id, %symbol, address = ?wallet.address, "Balance read failed: {}", e);
                        records.push(TransferRecord {
                            from: wallet.address,
                            to,
                            chain_id: *chain_id,
                            symbol,
                            amount: U256::zero(),
                            status: TransferStatus::Failed(e.to_string()),
                        });
                        continue;
                    }
                };
                if amount.is_zero() {
                    continue;
                }

                let status = match executor.transfer_token(&wallet.key, *chain_id, token, to, amount).await {
                    Ok(receipt) => {
                        info!(chain_id, %symbol, from = ?wallet.address, tx_hash = ?receipt.tx_hash, "Consolidated {}", amount);
                        TransferStatus::Sent(receipt.tx_hash)
                    }
                    Err(e) => {
                        warn!(chain_id, %symbol, from = ?wallet.address, "Transfer failed: {}", e);
                        TransferStatus::Failed(e.to_string())
                    }
                };
                records.push(TransferRecord { from: wallet.address, to, chain_id: *chain_id, symbol, amount, status });
            }
        }
    }
    Ok(records)
}

/// Send `amount` of native gas from wallet `from_index` to every other active
/// wallet on `chain_id` that holds less than `amount`.
pub async fn distribute(
    executor: &TxExecutor,
    registry: &ChainRegistry,
    store: &WalletStore,
    from_index: usize,
    chain_id: u64,
    amount: U256,
) -> Result<Vec<TransferRecord>, BotError> {
    let descriptor = registry.describe(chain_id)?;
    let source = store
        .get(from_index)
        .ok_or_else(|| BotError::Validation(format!("No wallet at index {}", from_index)))?;

    let mut records = Vec::new();
    for wallet in store.active() {
        if wallet.address == source.address {
            continue;
        }
        let record = |status| TransferRecord {
            from: source.address,
            to: wallet.address,
            chain_id,
            symbol: descriptor.native_symbol,
            amount,
            status,
        };

        let current = executor.chain().native_balance(chain_id, wallet.address).await?;
        if current >= amount {
            records.push(record(TransferStatus::Skipped(format!("already holds {}", current))));
            continue;
        }

        let available = executor.chain().native_balance(chain_id, source.address).await?;
        if available < amount {
            warn!(chain_id, from = ?source.address, %available, "Source wallet ran out of gas funds");
            records.push(record(TransferStatus::Failed(format!("source holds only {}", available))));
            break;
        }

        let status = match executor.transfer_native(&source.key, chain_id, wallet.address, amount).await {
            Ok(receipt) => {
                info!(chain_id, to = ?wallet.address, tx_hash = ?receipt.tx_hash, "Topped up {}", amount);
                TransferStatus::Sent(receipt.tx_hash)
            }
            Err(e) => TransferStatus::Failed(e.to_string()),
        };
        records.push(record(status));
    }
    Ok(records)
}
