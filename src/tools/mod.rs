pub mod funds;

pub use funds::{consolidate, distribute, TransferRecord, TransferStatus};
