// src/lib.rs
//! Cross-chain bridge cycling across Arbitrum, Optimism, Base and Linea.
//!
//! Each cycle reads a wallet's balances, swaps the chosen token through the
//! 1inch API, bridges the result to another chain through Relay and checks
//! the bridge status once.

pub mod api;
pub mod blockchain;
pub mod cli;
pub mod core;
pub mod orchestrator;
pub mod service;
pub mod strategy;
pub mod testing;
pub mod tools;

pub use crate::core::config::BotConfig;
pub use crate::core::errors::BotError;
