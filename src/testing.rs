//! In-memory stand-ins for the chain, the swap API and the bridge API.
//!
//! `MockChain` understands just enough ERC-20 and WETH calldata to keep
//! balances and allowances consistent after approve, deposit and transfer
//! calls. Other transactions can carry queued balance effects, which is how
//! the swap and bridge mocks make a router or deposit call move funds.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

use crate::api::bridge::{
    BridgeApi, BridgeQuote, BridgeQuoteRequest, BridgeStatus, BridgeStep, BridgeStepItem,
    DEPOSIT_STEP_ID,
};
use crate::api::swap::{SwapApi, SwapQuote, SwapQuoteRequest};
use crate::blockchain::chains::{ChainRegistry, NATIVE_TOKEN_ADDRESS};
use crate::blockchain::traits::{ChainAccess, TxPayload, TxReceipt};
use crate::core::abi::selector_from_signature;
use crate::core::domain::{PrivateKey, TokenSymbol};
use crate::core::errors::BotError;
use crate::orchestrator::Sleeper;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Gas price the mock reports when none is set: 0.01 gwei.
pub const DEFAULT_MOCK_GAS_PRICE: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: U256,
}

/// Balance change applied when a matching transaction is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceEffect {
    Credit { token: Address, owner: Address, amount: U256 },
    Debit { token: Address, owner: Address, amount: U256 },
}

#[derive(Default)]
struct ChainState {
    native: HashMap<(u64, Address), U256>,
    tokens: HashMap<(u64, Address, Address), U256>,
    decimals: HashMap<(u64, Address), u8>,
    allowances: HashMap<(u64, Address, Address, Address), U256>,
    gas_prices: HashMap<u64, U256>,
    unreachable: HashSet<u64>,
    broken_tokens: HashSet<(u64, Address)>,
    revert_to: HashSet<(u64, Address)>,
    time_out_to: HashSet<(u64, Address)>,
    effects: HashMap<(u64, Address), VecDeque<Vec<BalanceEffect>>>,
    gas_estimate: Option<U256>,
    sent: Vec<SentTx>,
}

/// `ChainAccess` over in-memory balances.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registry tokens get their real decimals (WETH 18, USDC 6).
    pub fn with_registry(registry: &ChainRegistry) -> Arc<Self> {
        let chain = Self::default();
        {
            let mut state = lock(&chain.state);
            for descriptor in registry.iter() {
                for (symbol, address) in &descriptor.tokens {
                    let decimals = if *symbol == TokenSymbol::Usdc { 6 } else { 18 };
                    state.decimals.insert((descriptor.chain_id, *address), decimals);
                }
            }
        }
        Arc::new(chain)
    }

    pub fn set_native(&self, chain_id: u64, owner: Address, amount: U256) {
        lock(&self.state).native.insert((chain_id, owner), amount);
    }

    pub fn set_token(&self, chain_id: u64, token: Address, owner: Address, amount: U256) {
        lock(&self.state).tokens.insert((chain_id, token, owner), amount);
    }

    pub fn set_decimals(&self, chain_id: u64, token: Address, decimals: u8) {
        lock(&self.state).decimals.insert((chain_id, token), decimals);
    }

    pub fn set_allowance(&self, chain_id: u64, token: Address, owner: Address, spender: Address, amount: U256) {
        lock(&self.state).allowances.insert((chain_id, token, owner, spender), amount);
    }

    pub fn set_gas_price(&self, chain_id: u64, price: U256) {
        lock(&self.state).gas_prices.insert(chain_id, price);
    }

    /// Same gas price on every chain.
    pub fn set_gas_price_everywhere(&self, price: U256) {
        let mut state = lock(&self.state);
        for chain_id in crate::blockchain::chains::SUPPORTED_CHAIN_IDS {
            state.gas_prices.insert(chain_id, price);
        }
    }

    pub fn set_gas_estimate(&self, estimate: U256) {
        lock(&self.state).gas_estimate = Some(estimate);
    }

    /// Every call on `chain_id` fails with a network error.
    pub fn fail_chain(&self, chain_id: u64) {
        lock(&self.state).unreachable.insert(chain_id);
    }

    /// Reads of one token contract fail.
    pub fn fail_token(&self, chain_id: u64, token: Address) {
        lock(&self.state).broken_tokens.insert((chain_id, token));
    }

    /// Transactions sent to `to` on `chain_id` are mined but revert.
    pub fn revert_calls_to(&self, chain_id: u64, to: Address) {
        lock(&self.state).revert_to.insert((chain_id, to));
    }

    /// Transactions sent to `to` on `chain_id` are broadcast but no receipt arrives.
    pub fn time_out_calls_to(&self, chain_id: u64, to: Address) {
        lock(&self.state).time_out_to.insert((chain_id, to));
    }

    /// Queue effects for the next transaction sent to `to` on `chain_id`.
    pub fn on_send(&self, chain_id: u64, to: Address, effects: Vec<BalanceEffect>) {
        lock(&self.state).effects.entry((chain_id, to)).or_default().push_back(effects);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        lock(&self.state).sent.clone()
    }

    pub fn sent_on(&self, chain_id: u64) -> Vec<SentTx> {
        self.sent().into_iter().filter(|tx| tx.chain_id == chain_id).collect()
    }

    pub fn native(&self, chain_id: u64, owner: Address) -> U256 {
        lock(&self.state).native.get(&(chain_id, owner)).copied().unwrap_or_default()
    }

    pub fn token(&self, chain_id: u64, token: Address, owner: Address) -> U256 {
        lock(&self.state).tokens.get(&(chain_id, token, owner)).copied().unwrap_or_default()
    }

    pub fn allowance_of(&self, chain_id: u64, token: Address, owner: Address, spender: Address) -> U256 {
        lock(&self.state)
            .allowances
            .get(&(chain_id, token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn reachable(state: &ChainState, chain_id: u64) -> Result<(), BotError> {
        if state.unreachable.contains(&chain_id) {
            return Err(BotError::Network(format!("chain {} unreachable", chain_id)));
        }
        Ok(())
    }
}

fn apply_effect(state: &mut ChainState, chain_id: u64, effect: &BalanceEffect) {
    match effect {
        BalanceEffect::Credit { token, owner, amount } => {
            if *token == NATIVE_TOKEN_ADDRESS {
                let entry = state.native.entry((chain_id, *owner)).or_default();
                *entry = entry.saturating_add(*amount);
            } else {
                let entry = state.tokens.entry((chain_id, *token, *owner)).or_default();
                *entry = entry.saturating_add(*amount);
            }
        }
        BalanceEffect::Debit { token, owner, amount } => {
            if *token == NATIVE_TOKEN_ADDRESS {
                let entry = state.native.entry((chain_id, *owner)).or_default();
                *entry = entry.saturating_sub(*amount);
            } else {
                let entry = state.tokens.entry((chain_id, *token, *owner)).or_default();
                *entry = entry.saturating_sub(*amount);
            }
        }
    }
}

fn word_address(data: &[u8], index: usize) -> Option<Address> {
    let start = 4 + index * 32;
    data.get(start + 12..start + 32).map(Address::from_slice)
}

fn word_uint(data: &[u8], index: usize) -> Option<U256> {
    let start = 4 + index * 32;
    data.get(start..start + 32).map(U256::from_big_endian)
}

/// Apply the state change of the ERC-20/WETH calls the bot makes itself.
fn apply_known_call(state: &mut ChainState, from: Address, payload: &TxPayload) {
    let chain_id = payload.chain_id;
    let data = payload.data.as_ref();
    if data.len() < 4 {
        if !payload.value.is_zero() {
            apply_effect(state, chain_id, &BalanceEffect::Debit { token: NATIVE_TOKEN_ADDRESS, owner: from, amount: payload.value });
            apply_effect(state, chain_id, &BalanceEffect::Credit { token: NATIVE_TOKEN_ADDRESS, owner: payload.to, amount: payload.value });
        }
        return;
    }
    let selector = &data[..4];
    if selector == selector_from_signature("approve(address,uint256)") {
        if let (Some(spender), Some(amount)) = (word_address(data, 0), word_uint(data, 1)) {
            state.allowances.insert((chain_id, payload.to, from, spender), amount);
        }
    } else if selector == selector_from_signature("transfer(address,uint256)") {
        if let (Some(to), Some(amount)) = (word_address(data, 0), word_uint(data, 1)) {
            apply_effect(state, chain_id, &BalanceEffect::Debit { token: payload.to, owner: from, amount });
            apply_effect(state, chain_id, &BalanceEffect::Credit { token: payload.to, owner: to, amount });
        }
    } else if selector == selector_from_signature("deposit()") {
        apply_effect(state, chain_id, &BalanceEffect::Debit { token: NATIVE_TOKEN_ADDRESS, owner: from, amount: payload.value });
        apply_effect(state, chain_id, &BalanceEffect::Credit { token: payload.to, owner: from, amount: payload.value });
    }
}

#[async_trait]
impl ChainAccess for MockChain {
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, BotError> {
        let state = lock(&self.state);
        Self::reachable(&state, chain_id)?;
        Ok(state.native.get(&(chain_id, owner)).copied().unwrap_or_default())
    }

    async fn token_balance(&self, chain_id: u64, token: Address, owner: Address) -> Result<U256, BotError> {
        let state = lock(&self.state);
        Self::reachable(&state, chain_id)?;
        if state.broken_tokens.contains(&(chain_id, token)) {
            return Err(BotError::Blockchain(format!("balanceOf reverted on {:?}", token)));
        }
        Ok(state.tokens.get(&(chain_id, token, owner)).copied().unwrap_or_default())
    }

    async fn token_decimals(&self, chain_id: u64, token: Address) -> Result<u8, BotError> {
        let state = lock(&self.state);
        Self::reachable(&state, chain_id)?;
        if state.broken_tokens.contains(&(chain_id, token)) {
            return Err(BotError::Blockchain(format!("decimals reverted on {:?}", token)));
        }
        Ok(state.decimals.get(&(chain_id, token)).copied().unwrap_or(18))
    }

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, BotError> {
        let state = lock(&self.state);
        Self::reachable(&state, chain_id)?;
        Ok(state.allowances.get(&(chain_id, token, owner, spender)).copied().unwrap_or_default())
    }

    async fn gas_price(&self, chain_id: u64) -> Result<U256, BotError> {
        let state = lock(&self.state);
        Self::reachable(&state, chain_id)?;
        Ok(state.gas_prices.get(&chain_id).copied().unwrap_or(U256::from(DEFAULT_MOCK_GAS_PRICE)))
    }

    async fn estimate_gas(&self, _from: Address, payload: &TxPayload) -> Result<U256, BotError> {
        let state = lock(&self.state);
        Self::reachable(&state, payload.chain_id)?;
        Ok(state.gas_estimate.unwrap_or(U256::from(100_000u64)))
    }

    async fn send_transaction(
        &self,
        key: &PrivateKey,
        payload: &TxPayload,
        gas_limit: U256,
    ) -> Result<TxReceipt, BotError> {
        let from = key.address()?;
        let mut state = lock(&self.state);
        Self::reachable(&state, payload.chain_id)?;

        state.sent.push(SentTx {
            chain_id: payload.chain_id,
            from,
            to: payload.to,
            data: payload.data.clone(),
            value: payload.value,
            gas_limit,
        });
        let tx_hash = H256::from_low_u64_be(state.sent.len() as u64);

        if state.time_out_to.contains(&(payload.chain_id, payload.to)) {
            return Err(BotError::Timeout(format!("No receipt for {:?}", tx_hash)));
        }
        if state.revert_to.contains(&(payload.chain_id, payload.to)) {
            return Ok(TxReceipt { tx_hash, success: false, gas_used: Some(gas_limit) });
        }

        apply_known_call(&mut state, from, payload);
        let queued = state.effects.get_mut(&(payload.chain_id, payload.to)).and_then(|q| q.pop_front());
        for effect in queued.unwrap_or_default() {
            apply_effect(&mut state, payload.chain_id, &effect);
        }

        Ok(TxReceipt { tx_hash, success: true, gas_used: Some(gas_limit) })
    }
}

/// Router address used by `MockSwapApi` unless overridden.
pub const MOCK_ROUTER: Address = Address::repeat_byte(0x11);

struct SwapState {
    outputs: HashMap<TokenSymbol, U256>,
    requests: Vec<SwapQuoteRequest>,
    fail_with: Option<String>,
    panic_on_quote: bool,
}

/// Swap API that quotes fixed outputs per destination symbol.
///
/// With a chain attached, each quote queues the matching balance moves on
/// the router so executing the quote actually swaps funds.
pub struct MockSwapApi {
    router: Address,
    chain: Option<Arc<MockChain>>,
    state: Mutex<SwapState>,
}

impl MockSwapApi {
    pub fn new() -> Self {
        Self {
            router: MOCK_ROUTER,
            chain: None,
            state: Mutex::new(SwapState {
                outputs: HashMap::new(),
                requests: Vec::new(),
                fail_with: None,
                panic_on_quote: false,
            }),
        }
    }

    pub fn with_chain(mut self, chain: Arc<MockChain>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Quoted output for swaps into `symbol`.
    pub fn set_output(&self, symbol: TokenSymbol, amount: U256) {
        lock(&self.state).outputs.insert(symbol, amount);
    }

    /// Quotes fail with a network error; the spender lookup keeps working.
    pub fn fail_quotes(&self, message: impl Into<String>) {
        lock(&self.state).fail_with = Some(message.into());
    }

    /// The next quote panics instead of answering.
    pub fn panic_on_quote(&self) {
        lock(&self.state).panic_on_quote = true;
    }

    pub fn requests(&self) -> Vec<SwapQuoteRequest> {
        lock(&self.state).requests.clone()
    }
}

impl Default for MockSwapApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapApi for MockSwapApi {
    async fn quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuote, BotError> {
        let explode = std::mem::take(&mut lock(&self.state).panic_on_quote);
        if explode {
            panic!("swap quote for chain {} panicked", request.chain_id);
        }
        let expected_out = {
            let mut state = lock(&self.state);
            state.requests.push(request.clone());
            if let Some(message) = &state.fail_with {
                return Err(BotError::Network(message.clone()));
            }
            state.outputs.get(&request.dst_symbol).copied().unwrap_or(request.amount)
        };

        if let Some(chain) = &self.chain {
            chain.on_send(
                request.chain_id,
                self.router,
                vec![
                    BalanceEffect::Debit { token: request.src_token, owner: request.account, amount: request.amount },
                    BalanceEffect::Credit { token: request.dst_token, owner: request.receiver, amount: expected_out },
                ],
            );
        }

        Ok(SwapQuote {
            chain_id: request.chain_id,
            src_token: request.src_token,
            src_symbol: request.src_symbol,
            src_decimals: None,
            dst_token: request.dst_token,
            dst_symbol: request.dst_symbol,
            dst_decimals: None,
            amount_in: request.amount,
            expected_out,
            tx: TxPayload {
                chain_id: request.chain_id,
                to: self.router,
                data: Bytes::from(vec![0x12, 0xaa, 0x3c, 0xaf]),
                value: U256::zero(),
            },
            spender: self.router,
        })
    }

    async fn spender(&self, _chain_id: u64) -> Result<Address, BotError> {
        Ok(self.router)
    }
}

/// Deposit contract used by `MockBridgeApi`.
pub const MOCK_DEPOSITORY: Address = Address::repeat_byte(0x22);

struct BridgeState {
    requests: Vec<BridgeQuoteRequest>,
    status_requests: Vec<String>,
    statuses: HashMap<String, String>,
    default_status: String,
    fail_quotes: Option<String>,
    fail_status: bool,
    omit_deposit_step: bool,
    omit_request_id: bool,
    payload_chain_override: Option<u64>,
    counter: u64,
}

/// Bridge API that answers with a single `deposit` step.
pub struct MockBridgeApi {
    registry: Arc<ChainRegistry>,
    state: Mutex<BridgeState>,
}

impl MockBridgeApi {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(BridgeState {
                requests: Vec::new(),
                status_requests: Vec::new(),
                statuses: HashMap::new(),
                default_status: "pending".to_string(),
                fail_quotes: None,
                fail_status: false,
                omit_deposit_step: false,
                omit_request_id: false,
                payload_chain_override: None,
                counter: 0,
            }),
        }
    }

    pub fn set_default_status(&self, status: impl Into<String>) {
        lock(&self.state).default_status = status.into();
    }

    pub fn set_status(&self, request_id: impl Into<String>, status: impl Into<String>) {
        lock(&self.state).statuses.insert(request_id.into(), status.into());
    }

    pub fn fail_quotes(&self, message: impl Into<String>) {
        lock(&self.state).fail_quotes = Some(message.into());
    }

    pub fn fail_status(&self) {
        lock(&self.state).fail_status = true;
    }

    pub fn omit_deposit_step(&self) {
        lock(&self.state).omit_deposit_step = true;
    }

    pub fn omit_request_id(&self) {
        lock(&self.state).omit_request_id = true;
    }

    /// Put the deposit transaction on a different chain than the quote's origin.
    pub fn override_payload_chain(&self, chain_id: u64) {
        lock(&self.state).payload_chain_override = Some(chain_id);
    }

    pub fn requests(&self) -> Vec<BridgeQuoteRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn status_requests(&self) -> Vec<String> {
        lock(&self.state).status_requests.clone()
    }
}

#[async_trait]
impl BridgeApi for MockBridgeApi {
    async fn quote(&self, request: &BridgeQuoteRequest) -> Result<BridgeQuote, BotError> {
        let destination_currency =
            crate::api::bridge::resolve_destination_currency(&self.registry, request)?;
        let mut state = lock(&self.state);
        state.requests.push(request.clone());
        if let Some(message) = &state.fail_quotes {
            return Err(BotError::Network(message.clone()));
        }
        state.counter += 1;
        let request_id = format!("0xrequest{}", state.counter);

        let value = if request.origin_currency == NATIVE_TOKEN_ADDRESS { request.amount } else { U256::zero() };
        let tx = TxPayload {
            chain_id: state.payload_chain_override.unwrap_or(request.origin_chain_id),
            to: MOCK_DEPOSITORY,
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            value,
        };
        let step_id = if state.omit_deposit_step { "approve" } else { DEPOSIT_STEP_ID };
        let request_id = if state.omit_request_id { None } else { Some(request_id) };

        Ok(BridgeQuote {
            origin_chain_id: request.origin_chain_id,
            destination_chain_id: request.destination_chain_id,
            origin_currency: request.origin_currency,
            destination_currency,
            amount: request.amount,
            expected_out: Some(request.amount),
            steps: vec![BridgeStep {
                id: step_id.to_string(),
                request_id: request_id.clone(),
                items: vec![BridgeStepItem { status: Some("incomplete".to_string()), tx }],
            }],
            request_id,
            time_estimate_secs: Some(10),
        })
    }

    async fn status(&self, request_id: &str) -> Result<BridgeStatus, BotError> {
        let mut state = lock(&self.state);
        state.status_requests.push(request_id.to_string());
        if state.fail_status {
            return Err(BotError::Network("status endpoint returned 500".to_string()));
        }
        let status = state.statuses.get(request_id).cloned().unwrap_or_else(|| state.default_status.clone());
        Ok(BridgeStatus { request_id: request_id.to_string(), status })
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Duration> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.calls).push(duration);
    }
}
