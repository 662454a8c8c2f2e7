use ethers::types::U256;
use thiserror::Error;

/// Error type shared by every stage of the bridge cycle.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A chain id outside the supported set was requested.
    #[error("Unknown chain: {0}")]
    UnknownChain(u64),

    /// Transport failures talking to an RPC node or a REST API.
    #[error("Network error: {0}")]
    Network(String),

    /// The node answered but the call itself failed.
    #[error("Blockchain error: {0}")]
    Blockchain(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Live gas price is above the configured ceiling; nothing was submitted.
    #[error("Gas price too high on chain {chain_id}: {price} wei > ceiling {ceiling} wei")]
    GasPriceTooHigh { chain_id: u64, price: U256, ceiling: U256 },

    /// An upstream quote is missing a field the executor needs.
    #[error("Malformed quote: {0}")]
    MalformedQuote(String),

    /// Submitted transaction reverted or could not be broadcast.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Wallet store errors.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl BotError {
    /// Errors that end a cycle early without counting it as failed.
    pub fn is_skippable(&self) -> bool {
        matches!(self, BotError::GasPriceTooHigh { .. } | BotError::InsufficientFunds(_))
    }

    /// Errors worth trying again on a later cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BotError::Network(_) | BotError::Timeout(_))
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Validation(err.to_string())
    }
}

impl From<toml::de::Error> for BotError {
    fn from(err: toml::de::Error) -> Self {
        BotError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BotError::Timeout(err.to_string())
        } else {
            BotError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_config_error() {
        let err = BotError::Config("missing SWAP_API_KEY".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing SWAP_API_KEY");
    }

    #[test]
    fn test_display_gas_price_too_high() {
        let err = BotError::GasPriceTooHigh {
            chain_id: 8453,
            price: U256::from(200_000_000u64),
            ceiling: U256::from(100_000_000u64),
        };
        assert_eq!(
            err.to_string(),
            "Gas price too high on chain 8453: 200000000 wei > ceiling 100000000 wei"
        );
    }

    #[test]
    fn test_skippable_and_retryable() {
        let gas = BotError::GasPriceTooHigh {
            chain_id: 10,
            price: U256::one(),
            ceiling: U256::zero(),
        };
        assert!(gas.is_skippable());
        assert!(!gas.is_retryable());
        assert!(BotError::Network("reset".into()).is_retryable());
        assert!(!BotError::MalformedQuote("no deposit step".into()).is_skippable());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "wallets.json");
        match BotError::from(io) {
            BotError::Storage(msg) => assert!(msg.contains("wallets.json")),
            other => panic!("Expected Storage variant, got {:?}", other),
        }
    }
}
