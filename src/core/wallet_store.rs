//! File-backed wallet pool
//!
//! The store is a JSON array of `{ "address", "private_key", "active" }`
//! records. It is read once at startup and never written back.

use std::fs;
use std::path::Path;

use ethers::types::Address;
use serde::Deserialize;
use tracing::info;
use zeroize::Zeroize;

use crate::core::domain::PrivateKey;
use crate::core::errors::BotError;

#[derive(Deserialize)]
struct RawWalletRecord {
    address: String,
    private_key: String,
    #[serde(default = "default_active")]
    active: bool,
}

impl Drop for RawWalletRecord {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug)]
pub struct WalletRecord {
    pub address: Address,
    pub key: PrivateKey,
    pub active: bool,
}

#[derive(Debug)]
pub struct WalletStore {
    records: Vec<WalletRecord>,
}

impl WalletStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let path = path.as_ref();
        let mut raw = fs::read_to_string(path).map_err(|e| {
            BotError::Storage(format!("Cannot read wallet file {}: {}", path.display(), e))
        })?;
        let store = Self::from_json(&raw);
        raw.zeroize();
        let store = store?;
        info!(
            path = %path.display(),
            total = store.records.len(),
            active = store.active().len(),
            "Wallets loaded"
        );
        Ok(store)
    }

    /// Parse records and check that every key derives its recorded address.
    pub fn from_json(json: &str) -> Result<Self, BotError> {
        let raw: Vec<RawWalletRecord> = serde_json::from_str(json)
            .map_err(|e| BotError::Storage(format!("Invalid wallet file: {}", e)))?;

        let mut records = Vec::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            let address: Address = entry.address.trim().parse().map_err(|e| {
                BotError::Address(format!("Wallet #{} has a bad address: {}", index, e))
            })?;
            let key = PrivateKey::from_hex(&entry.private_key)?;
            let derived = key.address()?;
            if derived != address {
                return Err(BotError::InvalidPrivateKey(format!(
                    "Wallet #{} key derives {:?}, record says {:?}",
                    index, derived, address
                )));
            }
            records.push(WalletRecord { address, key, active: entry.active });
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[WalletRecord] {
        &self.records
    }

    pub fn active(&self) -> Vec<&WalletRecord> {
        self.records.iter().filter(|r| r.active).collect()
    }

    /// Active wallets, or a fatal `Config` error when there are none.
    pub fn require_active(&self) -> Result<Vec<&WalletRecord>, BotError> {
        let active = self.active();
        if active.is_empty() {
            return Err(BotError::Config("No active wallets".to_string()));
        }
        Ok(active)
    }

    pub fn get(&self, index: usize) -> Option<&WalletRecord> {
        self.records.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn parses_records_with_and_without_prefix() {
        let json = format!(
            r#"[{{"address":"{a}","private_key":"{k}","active":true}},
                {{"address":"{a}","private_key":"0x{k}","active":false}}]"#,
            a = ADDRESS,
            k = KEY
        );
        let store = WalletStore::from_json(&json).unwrap();
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.active().len(), 1);
        assert_eq!(store.active()[0].address, ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn active_defaults_to_true() {
        let json = format!(r#"[{{"address":"{}","private_key":"{}"}}]"#, ADDRESS, KEY);
        assert!(WalletStore::from_json(&json).unwrap().records()[0].active);
    }

    #[test]
    fn mismatched_address_is_rejected() {
        let json = format!(
            r#"[{{"address":"0x0000000000000000000000000000000000000001","private_key":"{}"}}]"#,
            KEY
        );
        assert!(matches!(WalletStore::from_json(&json), Err(BotError::InvalidPrivateKey(_))));
    }

    #[test]
    fn no_active_wallets_is_fatal() {
        let json = format!(r#"[{{"address":"{}","private_key":"{}","active":false}}]"#, ADDRESS, KEY);
        let store = WalletStore::from_json(&json).unwrap();
        assert!(matches!(store.require_active(), Err(BotError::Config(_))));
    }
}
