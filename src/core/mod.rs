pub mod abi;
pub mod config;
pub mod domain;
pub mod errors;
pub mod wallet_store;

pub use wallet_store::{WalletRecord, WalletStore};
