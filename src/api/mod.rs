// src/api/mod.rs

pub mod bridge; // Relay cross-chain bridge
pub mod swap; // 1inch DEX aggregation
