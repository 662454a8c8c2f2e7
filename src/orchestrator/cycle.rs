//! One bridge cycle for one wallet.
//!
//! BalanceCheck -> Select -> GasGuard -> ApproveForSwap -> Swap ->
//! ApproveForBridge -> Bridge -> StatusPoll. Every step either advances or
//! ends the cycle as `Skipped` or `Failed`; nothing already sent on chain is
//! rolled back.

use std::fmt;
use std::sync::Arc;

use ethers::types::{Address, H256, U256};
use rand::Rng;
use tracing::{error, info, warn};

use super::gas_guard::{GasGuard, GasStatus};
use crate::api::bridge::{
    execute_bridge, BridgeApi, BridgeQuoteRequest, BridgeStatus, DestinationCurrency,
};
use crate::api::swap::{execute_swap, SwapApi, SwapOutcome, SwapQuoteRequest};
use crate::blockchain::balance::BalanceReader;
use crate::blockchain::chains::ChainRegistry;
use crate::blockchain::executor::TxExecutor;
use crate::blockchain::traits::ChainAccess;
use crate::core::domain::{BridgeCandidate, PrivateKey, TokenSymbol};
use crate::core::errors::BotError;
use crate::core::wallet_store::WalletRecord;
use crate::strategy::{pick_destination, select_candidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    BalanceCheck,
    Select,
    GasGuard,
    ApproveForSwap,
    Swap,
    ApproveForBridge,
    Bridge,
    StatusPoll,
    /// The cycle panicked; the step it reached is not known.
    Aborted,
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStep::BalanceCheck => "balance_check",
            CycleStep::Select => "select",
            CycleStep::GasGuard => "gas_guard",
            CycleStep::ApproveForSwap => "approve_for_swap",
            CycleStep::Swap => "swap",
            CycleStep::ApproveForBridge => "approve_for_bridge",
            CycleStep::Bridge => "bridge",
            CycleStep::StatusPoll => "status_poll",
            CycleStep::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    pub source_symbol: TokenSymbol,
    pub swapped_symbol: TokenSymbol,
    /// Symbol requested on the destination chain; equals `source_symbol`.
    pub delivered_symbol: TokenSymbol,
    pub swap_tx: H256,
    pub bridged_amount: U256,
    pub bridge_tx: H256,
    pub request_id: String,
    /// Latest status seen right after submission, if the read succeeded.
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Skipped { step: CycleStep, reason: String },
    /// `retryable` marks transport errors and timeouts that a later cycle may not hit.
    Failed { step: CycleStep, error: String, retryable: bool },
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }

    pub fn log(&self, address: Address) {
        match self {
            CycleOutcome::Completed(report) => info!(
                address = ?address,
                from = report.source_chain_id,
                to = report.destination_chain_id,
                request_id = %report.request_id,
                status = report.status.as_deref().unwrap_or("unknown"),
                "Cycle completed: {} -> {} bridged as {}",
                report.source_symbol,
                report.swapped_symbol,
                report.delivered_symbol
            ),
            CycleOutcome::Skipped { step, reason } => {
                info!(address = ?address, %step, "Cycle skipped: {}", reason)
            }
            CycleOutcome::Failed { step, error, retryable } => {
                error!(address = ?address, %step, retryable, "Cycle failed: {}", error)
            }
        }
    }
}

/// Early exit of a cycle.
enum Halt {
    Skip(CycleStep, String),
    Fail(CycleStep, BotError),
}

impl From<Halt> for CycleOutcome {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Skip(step, reason) => CycleOutcome::Skipped { step, reason },
            Halt::Fail(step, error) => CycleOutcome::Failed {
                step,
                retryable: error.is_retryable(),
                error: error.to_string(),
            },
        }
    }
}

/// Tag an error with the step it happened in. Gas-ceiling and
/// insufficient-funds errors skip the cycle, everything else fails it.
fn at(step: CycleStep) -> impl FnOnce(BotError) -> Halt {
    move |e| {
        if e.is_skippable() {
            Halt::Skip(step, e.to_string())
        } else {
            Halt::Fail(step, e)
        }
    }
}

pub struct CycleRunner {
    registry: Arc<ChainRegistry>,
    chain: Arc<dyn ChainAccess>,
    balances: BalanceReader,
    executor: TxExecutor,
    swap: Arc<dyn SwapApi>,
    bridge: Arc<dyn BridgeApi>,
    gas_guard: GasGuard,
    slippage_percent: f64,
    bridge_fraction_percent: u8,
}

impl CycleRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ChainRegistry>,
        executor: TxExecutor,
        swap: Arc<dyn SwapApi>,
        bridge: Arc<dyn BridgeApi>,
        gas_guard: GasGuard,
        slippage_percent: f64,
        bridge_fraction_percent: u8,
    ) -> Self {
        let chain = executor.chain().clone();
        Self {
            balances: BalanceReader::new(chain.clone(), registry.clone()),
            registry,
            chain,
            executor,
            swap,
            bridge,
            gas_guard,
            slippage_percent,
            bridge_fraction_percent: bridge_fraction_percent.clamp(1, 100),
        }
    }

    pub fn balances(&self) -> &BalanceReader {
        &self.balances
    }

    /// Run one cycle. Never returns an error: every failure is folded into the outcome.
    pub async fn run_cycle<R: Rng + ?Sized>(&self, wallet: &WalletRecord, rng: &mut R) -> CycleOutcome {
        match self.drive(&wallet.key, wallet.address, rng).await {
            Ok(report) => CycleOutcome::Completed(report),
            Err(halt) => halt.into(),
        }
    }

    async fn drive<R: Rng + ?Sized>(
        &self,
        key: &PrivateKey,
        address: Address,
        rng: &mut R,
    ) -> Result<CycleReport, Halt> {
        let snapshot = self.balances.snapshot(address).await;

        let candidate = select_candidate(&snapshot, &self.registry).ok_or_else(|| {
            Halt::Skip(CycleStep::Select, "no tracked token above its minimum".to_string())
        })?;
        let destination = pick_destination(rng, &self.registry, candidate.chain_id)
            .map_err(at(CycleStep::Select))?;
        info!(
            address = ?address,
            chain_id = candidate.chain_id,
            destination,
            "Selected {} {} -> {}",
            candidate.amount,
            candidate.symbol,
            candidate.target_symbol
        );

        match self.gas_guard.ensure_gas(key, candidate.chain_id).await.map_err(at(CycleStep::GasGuard))? {
            GasStatus::Insufficient { reason } => return Err(Halt::Skip(CycleStep::GasGuard, reason)),
            GasStatus::Rescued { request_id, status } => {
                info!(chain_id = candidate.chain_id, %request_id, %status, "Continuing after gas rescue")
            }
            GasStatus::Sufficient => {}
        }

        let spender = self.swap.spender(candidate.chain_id).await.map_err(at(CycleStep::ApproveForSwap))?;
        self.executor
            .approve_if_unset(key, candidate.chain_id, candidate.token_address, spender)
            .await
            .map_err(at(CycleStep::ApproveForSwap))?;

        let swap = self.swap_candidate(key, address, &candidate).await.map_err(at(CycleStep::Swap))?;
        let bridged_amount =
            self.bridge_amount(address, candidate.chain_id, &swap).await.map_err(at(CycleStep::Swap))?;
        if bridged_amount.is_zero() {
            return Err(Halt::Fail(
                CycleStep::Swap,
                BotError::TransactionFailed("swap produced no output to bridge".to_string()),
            ));
        }

        let request = BridgeQuoteRequest {
            user: address,
            recipient: address,
            origin_chain_id: candidate.chain_id,
            destination_chain_id: destination,
            origin_currency: swap.output_token,
            origin_symbol: swap.output_symbol,
            destination: DestinationCurrency::Symbol(swap.output_symbol.opposite()),
            amount: bridged_amount,
        };
        let quote = self.bridge.quote(&request).await.map_err(at(CycleStep::Bridge))?;

        let deposit = quote.deposit_tx().map_err(at(CycleStep::ApproveForBridge))?;
        self.executor
            .approve_if_unset(key, deposit.chain_id, swap.output_token, deposit.to)
            .await
            .map_err(at(CycleStep::ApproveForBridge))?;

        let execution = execute_bridge(&self.executor, key, &quote).await.map_err(at(CycleStep::Bridge))?;

        let status = match self.bridge.status(&execution.request_id).await {
            Ok(BridgeStatus { status, .. }) => Some(status),
            Err(e) => {
                warn!(request_id = %execution.request_id, step = %CycleStep::StatusPoll, "Status unavailable: {}", e);
                None
            }
        };

        Ok(CycleReport {
            source_chain_id: candidate.chain_id,
            destination_chain_id: destination,
            source_symbol: candidate.symbol,
            swapped_symbol: swap.output_symbol,
            delivered_symbol: swap.output_symbol.opposite(),
            swap_tx: swap.tx_hash,
            bridged_amount,
            bridge_tx: execution.tx_hash,
            request_id: execution.request_id,
            status,
        })
    }

    async fn swap_candidate(
        &self,
        key: &PrivateKey,
        address: Address,
        candidate: &BridgeCandidate,
    ) -> Result<SwapOutcome, BotError> {
        let dst_token = self.registry.describe(candidate.chain_id)?.token_address(candidate.target_symbol)?;
        let request = SwapQuoteRequest {
            chain_id: candidate.chain_id,
            account: address,
            receiver: address,
            src_token: candidate.token_address,
            src_symbol: candidate.symbol,
            dst_token,
            dst_symbol: candidate.target_symbol,
            amount: candidate.amount,
            slippage: self.slippage_percent,
        };
        let quote = self.swap.quote(&request).await?;
        execute_swap(&self.executor, key, &quote, None).await
    }

    /// Share of the swap output to bridge: the post-swap balance capped at the
    /// quoted output, scaled by the configured fraction.
    async fn bridge_amount(
        &self,
        address: Address,
        chain_id: u64,
        swap: &SwapOutcome,
    ) -> Result<U256, BotError> {
        let received = match self.chain.token_balance(chain_id, swap.output_token, address).await {
            Ok(balance) => balance.min(swap.output_amount),
            Err(e) => {
                warn!(chain_id, "Post-swap balance unavailable, using quoted output: {}", e);
                swap.output_amount
            }
        };
        received
            .checked_mul(U256::from(self.bridge_fraction_percent))
            .map(|scaled| scaled / U256::from(100u64))
            .ok_or_else(|| {
                BotError::MalformedQuote(format!("Swap output {} too large to bridge", received))
            })
    }
}
