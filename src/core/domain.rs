use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::core::errors::BotError;

/// Tokens the bot knows how to hold, swap and bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenSymbol {
    /// The chain's native gas currency.
    Eth,
    Weth,
    Usdc,
}

impl TokenSymbol {
    /// Symbols scanned by the selection policy, in priority order.
    pub const TRACKED: [TokenSymbol; 2] = [TokenSymbol::Weth, TokenSymbol::Usdc];

    /// The symbol a tracked token is swapped into. Native gas maps to itself.
    pub fn opposite(self) -> TokenSymbol {
        match self {
            TokenSymbol::Weth => TokenSymbol::Usdc,
            TokenSymbol::Usdc => TokenSymbol::Weth,
            TokenSymbol::Eth => TokenSymbol::Eth,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSymbol::Eth => "ETH",
            TokenSymbol::Weth => "WETH",
            TokenSymbol::Usdc => "USDC",
        }
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenSymbol {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ETH" => Ok(TokenSymbol::Eth),
            "WETH" => Ok(TokenSymbol::Weth),
            "USDC" => Ok(TokenSymbol::Usdc),
            other => Err(BotError::Validation(format!("Unsupported token symbol: {}", other))),
        }
    }
}

/// One balance read. A failed read keeps `raw` at zero and records the reason in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub symbol: TokenSymbol,
    pub owner: Address,
    pub chain_id: u64,
    pub raw: U256,
    pub decimals: u8,
    pub formatted: String,
    pub error: Option<String>,
}

impl TokenBalance {
    pub fn available(symbol: TokenSymbol, owner: Address, chain_id: u64, raw: U256, decimals: u8) -> Self {
        let formatted = ethers::utils::format_units(raw, decimals as u32)
            .unwrap_or_else(|_| raw.to_string());
        Self { symbol, owner, chain_id, raw, decimals, formatted, error: None }
    }

    pub fn unavailable(symbol: TokenSymbol, owner: Address, chain_id: u64, error: impl Into<String>) -> Self {
        Self {
            symbol,
            owner,
            chain_id,
            raw: U256::zero(),
            decimals: 0,
            formatted: "unavailable".to_string(),
            error: Some(error.into()),
        }
    }

    /// Raw amount, or `None` when the read failed.
    pub fn amount(&self) -> Option<U256> {
        if self.error.is_some() {
            None
        } else {
            Some(self.raw)
        }
    }
}

/// Balances held on a single chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainBalances {
    pub native: TokenBalance,
    pub tokens: BTreeMap<TokenSymbol, TokenBalance>,
}

/// Every supported chain appears as a key, even when all of its reads failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalanceSnapshot {
    pub address: Address,
    pub chains: BTreeMap<u64, ChainBalances>,
}

impl AccountBalanceSnapshot {
    pub fn token(&self, chain_id: u64, symbol: TokenSymbol) -> Option<&TokenBalance> {
        let chain = self.chains.get(&chain_id)?;
        match symbol {
            TokenSymbol::Eth => Some(&chain.native),
            _ => chain.tokens.get(&symbol),
        }
    }

    pub fn native(&self, chain_id: u64) -> Option<&TokenBalance> {
        self.chains.get(&chain_id).map(|c| &c.native)
    }
}

/// The token chosen to move this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCandidate {
    pub symbol: TokenSymbol,
    pub chain_id: u64,
    pub token_address: Address,
    pub amount: U256,
    /// What the candidate is swapped into before bridging.
    pub target_symbol: TokenSymbol,
}

/// Secp256k1 signing key kept behind `secrecy`.
pub struct PrivateKey(Secret<[u8; 32]>);

impl PrivateKey {
    pub fn new(k: [u8; 32]) -> Self {
        Self(Secret::new(k))
    }

    /// Parse a hex key with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, BotError> {
        let trimmed = s.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = hex::decode(hex_part)
            .map_err(|e| BotError::InvalidPrivateKey(format!("not hex: {}", e)))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            zeroize::Zeroize::zeroize(&mut bytes);
            return Err(BotError::InvalidPrivateKey(format!("expected 32 bytes, got {}", len)));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        zeroize::Zeroize::zeroize(&mut bytes);
        Ok(Self::new(arr))
    }

    /// Scoped access to the raw key bytes.
    pub fn with_secret<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8; 32]) -> R,
    {
        f(self.0.expose_secret())
    }

    /// Build a signer bound to `chain_id`. Do NOT log the result's key.
    pub fn signer(&self, chain_id: u64) -> Result<LocalWallet, BotError> {
        self.with_secret(|bytes| {
            LocalWallet::from_bytes(bytes)
                .map(|w| w.with_chain_id(chain_id))
                .map_err(|e| BotError::InvalidPrivateKey(e.to_string()))
        })
    }

    pub fn address(&self) -> Result<Address, BotError> {
        Ok(self.signer(1)?.address())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}
