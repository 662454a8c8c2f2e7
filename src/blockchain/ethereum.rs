use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    prelude::{JsonRpcClient, *},
    providers::{Http, Provider},
    types::{
        transaction::eip2718::TypedTransaction, Address, BlockNumber, Bytes,
        Eip1559TransactionRequest, NameOrAddress, U256,
    },
};
use tracing::{debug, info, warn};

use super::chains::{ChainDescriptor, ChainRegistry};
use super::traits::{ChainAccess, TxPayload, TxReceipt};
use crate::core::abi;
use crate::core::domain::PrivateKey;
use crate::core::errors::BotError;

/// JSON-RPC client bound to a single chain.
#[derive(Clone)]
pub struct EthereumClient<P: JsonRpcClient + Clone = Http> {
    provider: Provider<P>,
    network_name: String,
    chain_id: u64,
    confirmation_timeout: Option<Duration>,
}

impl EthereumClient<Http> {
    /// Build an HTTP client for `descriptor`. No request is made here; the chain id is trusted
    /// from the registry so that one dead endpoint cannot block startup.
    pub fn new(
        descriptor: &ChainDescriptor,
        confirmation_timeout: Option<Duration>,
    ) -> Result<Self, BotError> {
        let rpc_url_clean = descriptor.rpc_url.trim();
        let parsed_url = reqwest::Url::parse(rpc_url_clean).map_err(|e| {
            BotError::Config(format!("Invalid RPC URL '{}': {}", rpc_url_clean, e))
        })?;

        // Short timeout; honour proxy environment vars.
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(15));
        if let Ok(proxy) = std::env::var("HTTPS_PROXY").or_else(|_| std::env::var("HTTP_PROXY")) {
            if let Ok(p) = reqwest::Proxy::all(proxy) {
                builder = builder.proxy(p);
            }
        }
        let client = builder
            .build()
            .map_err(|e| BotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let provider = Provider::new(Http::new_with_client(parsed_url, client));
        debug!(chain_id = descriptor.chain_id, "RPC client ready for {}", descriptor.name);

        Ok(Self {
            provider,
            network_name: descriptor.name.clone(),
            chain_id: descriptor.chain_id,
            confirmation_timeout,
        })
    }
}

impl<P> EthereumClient<P>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
{
    /// Wrap an existing provider, e.g. a `MockProvider` in tests.
    pub fn new_with_provider(provider: Provider<P>, chain_id: u64) -> EthereumClient<P> {
        EthereumClient {
            provider,
            network_name: format!("chain-{}", chain_id),
            chain_id,
            confirmation_timeout: None,
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub async fn native_balance(&self, owner: Address) -> Result<U256, BotError> {
        self.provider
            .get_balance(owner, None)
            .await
            .map_err(|e| BotError::Blockchain(format!("Failed to get balance: {}", e)))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BotError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.provider
            .call(&tx, None)
            .await
            .map_err(|e| BotError::Blockchain(format!("eth_call to {:?} failed: {}", to, e)))
    }

    pub async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, BotError> {
        let out = self.call(token, abi::encode_balance_of(owner)).await?;
        abi::decode_uint256(&out)
    }

    pub async fn token_decimals(&self, token: Address) -> Result<u8, BotError> {
        let out = self.call(token, abi::encode_decimals()).await?;
        abi::decode_decimals(&out)
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, BotError> {
        let out = self.call(token, abi::encode_allowance(owner, spender)).await?;
        abi::decode_uint256(&out)
    }

    pub async fn gas_price(&self) -> Result<U256, BotError> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| BotError::Network(format!("Failed to get gas price: {}", e)))?;
        debug!(chain_id = self.chain_id, "gas price = {} wei", price);
        Ok(price)
    }

    pub async fn estimate_gas(&self, from: Address, payload: &TxPayload) -> Result<U256, BotError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(payload.to)
            .data(payload.data.clone())
            .value(payload.value)
            .into();
        self.provider.estimate_gas(&tx, None).await.map_err(|e| {
            // a revert during estimation usually means the account cannot cover the call
            BotError::TransactionFailed(format!("Gas estimation failed: {}", e))
        })
    }

    pub async fn send_transaction(
        &self,
        key: &PrivateKey,
        payload: &TxPayload,
        gas_limit: U256,
    ) -> Result<TxReceipt, BotError> {
        if payload.chain_id != self.chain_id {
            return Err(BotError::Validation(format!(
                "Payload for chain {} routed to chain {}",
                payload.chain_id, self.chain_id
            )));
        }
        let wallet = key.signer(self.chain_id)?;
        let from = wallet.address();

        let gas_price = self.gas_price().await?;
        let nonce = self
            .provider
            .get_transaction_count(from, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| BotError::Network(format!("Failed to get nonce: {}", e)))?;

        // Fees are derived from the legacy price; L2 base fees move fast so leave 2x headroom.
        let tx = Eip1559TransactionRequest {
            from: Some(from),
            to: Some(NameOrAddress::Address(payload.to)),
            value: Some(payload.value),
            data: Some(payload.data.clone()),
            gas: Some(gas_limit),
            nonce: Some(nonce),
            max_fee_per_gas: Some(gas_price.saturating_mul(U256::from(2u64))),
            max_priority_fee_per_gas: Some(gas_price / U256::from(10u64)),
            chain_id: Some(self.chain_id.into()),
            ..Default::default()
        };

        let client = SignerMiddleware::new(self.provider.clone(), wallet);
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| BotError::TransactionFailed(format!("Failed to send transaction: {}", e)))?;
        let tx_hash = pending.tx_hash();
        info!(chain_id = self.chain_id, tx_hash = ?tx_hash, "Transaction sent, awaiting receipt");

        let receipt = match self.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                BotError::Timeout(format!("No receipt for {:?} after {:?}", tx_hash, limit))
            })?,
            None => pending.await,
        }
        .map_err(|e| BotError::Network(format!("Failed waiting for {:?}: {}", tx_hash, e)))?;

        let receipt = receipt.ok_or_else(|| {
            BotError::TransactionFailed(format!("Transaction {:?} dropped from mempool", tx_hash))
        })?;
        let success = receipt.status == Some(U64::from(1));
        if !success {
            warn!(chain_id = self.chain_id, tx_hash = ?tx_hash, "Transaction reverted");
        }
        Ok(TxReceipt { tx_hash, success, gas_used: receipt.gas_used })
    }
}

/// `ChainAccess` backed by one `EthereumClient` per supported chain.
pub struct RpcChainAccess<P: JsonRpcClient + Clone = Http> {
    clients: BTreeMap<u64, EthereumClient<P>>,
}

impl RpcChainAccess<Http> {
    pub fn from_registry(
        registry: &ChainRegistry,
        confirmation_timeout: Option<Duration>,
    ) -> Result<Self, BotError> {
        let mut clients = BTreeMap::new();
        for descriptor in registry.iter() {
            clients.insert(descriptor.chain_id, EthereumClient::new(descriptor, confirmation_timeout)?);
        }
        info!("Connected RPC clients for {} chains", clients.len());
        Ok(Self { clients })
    }
}

impl<P> RpcChainAccess<P>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
{
    pub fn with_clients(clients: impl IntoIterator<Item = EthereumClient<P>>) -> Self {
        Self { clients: clients.into_iter().map(|c| (c.chain_id(), c)).collect() }
    }

    fn client(&self, chain_id: u64) -> Result<&EthereumClient<P>, BotError> {
        self.clients.get(&chain_id).ok_or(BotError::UnknownChain(chain_id))
    }
}

#[async_trait]
impl<P> ChainAccess for RpcChainAccess<P>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
{
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, BotError> {
        self.client(chain_id)?.native_balance(owner).await
    }

    async fn token_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<U256, BotError> {
        self.client(chain_id)?.token_balance(token, owner).await
    }

    async fn token_decimals(&self, chain_id: u64, token: Address) -> Result<u8, BotError> {
        self.client(chain_id)?.token_decimals(token).await
    }

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, BotError> {
        self.client(chain_id)?.allowance(token, owner, spender).await
    }

    async fn gas_price(&self, chain_id: u64) -> Result<U256, BotError> {
        self.client(chain_id)?.gas_price().await
    }

    async fn estimate_gas(&self, from: Address, payload: &TxPayload) -> Result<U256, BotError> {
        self.client(payload.chain_id)?.estimate_gas(from, payload).await
    }

    async fn send_transaction(
        &self,
        key: &PrivateKey,
        payload: &TxPayload,
        gas_limit: U256,
    ) -> Result<TxReceipt, BotError> {
        self.client(payload.chain_id)?.send_transaction(key, payload, gas_limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::MockProvider;

    fn mocked(chain_id: u64) -> (EthereumClient<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (EthereumClient::new_with_provider(provider, chain_id), mock)
    }

    fn word(v: u64) -> Bytes {
        Bytes::from(abi::abi_word_uint256(U256::from(v)).to_vec())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn native_balance_reads_eth_get_balance() {
        let (client, mock) = mocked(8453);
        mock.push(U256::from(2_000_000_000_000_000u64)).unwrap();
        let bal = client.native_balance(Address::repeat_byte(1)).await.unwrap();
        assert_eq!(bal, U256::from(2_000_000_000_000_000u64));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn token_balance_decodes_call_result() {
        let (client, mock) = mocked(10);
        mock.push::<Bytes, _>(word(5_000_000)).unwrap();
        let bal = client
            .token_balance(Address::repeat_byte(2), Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(bal, U256::from(5_000_000u64));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn token_decimals_decodes_call_result() {
        let (client, mock) = mocked(10);
        mock.push::<Bytes, _>(word(6)).unwrap();
        assert_eq!(client.token_decimals(Address::repeat_byte(2)).await.unwrap(), 6);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn gas_price_passes_through() {
        let (client, mock) = mocked(42161);
        mock.push(U256::from(10_000_000u64)).unwrap();
        assert_eq!(client.gas_price().await.unwrap(), U256::from(10_000_000u64));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_chain_is_rejected_by_router() {
        let (client, _mock) = mocked(10);
        let access = RpcChainAccess::with_clients(vec![client]);
        let err = access.gas_price(8453).await.unwrap_err();
        assert!(matches!(err, BotError::UnknownChain(8453)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn payload_for_other_chain_is_refused() {
        let (client, _mock) = mocked(10);
        let key = PrivateKey::new([0x11; 32]);
        let payload = TxPayload {
            chain_id: 8453,
            to: Address::repeat_byte(3),
            data: Bytes::new(),
            value: U256::zero(),
        };
        let err = client.send_transaction(&key, &payload, U256::from(21_000u64)).await.unwrap_err();
        assert!(matches!(err, BotError::Validation(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_receipt_times_out() {
        let (provider, mock) = Provider::mocked();
        let client = EthereumClient::new_with_provider(provider, 8453)
            .with_confirmation_timeout(Some(Duration::from_millis(50)));
        // responses pop in reverse: gas price, nonce, then the raw send
        mock.push::<H256, _>(H256::repeat_byte(0xab)).unwrap();
        mock.push::<U256, _>(U256::from(7u64)).unwrap();
        mock.push::<U256, _>(U256::from(10_000_000u64)).unwrap();

        let key = PrivateKey::new([0x11; 32]);
        let payload = TxPayload {
            chain_id: 8453,
            to: Address::repeat_byte(3),
            data: Bytes::new(),
            value: U256::zero(),
        };
        let err = client.send_transaction(&key, &payload, U256::from(21_000u64)).await.unwrap_err();
        assert!(matches!(err, BotError::Timeout(ref m) if m.contains("No receipt")), "{:?}", err);
    }
}
