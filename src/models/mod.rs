pub mod transaction;
pub mod amount;

pub use transaction::{TokenTransfer, TransactionStatus, TransferEvent};
pub use amount::{format_amount, parse_amount, ETHER_DECIMALS};
