//! Decision logic that does not touch the network.

pub mod selection;

pub use selection::{min_balance, pick_destination, select_candidate, USDC_MIN_BALANCE, WETH_MIN_BALANCE};
