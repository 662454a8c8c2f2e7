pub mod balance;
pub mod chains;
pub mod ethereum;
pub mod executor;
pub mod traits;

pub use chains::{ChainDescriptor, ChainRegistry};
pub use traits::{ChainAccess, TxPayload, TxReceipt};
