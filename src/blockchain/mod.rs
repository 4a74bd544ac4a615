pub mod address;
pub mod address_filter;
pub mod contract;
pub mod monitor;
pub mod rpc_client;
pub mod status;
pub mod submitter;
pub mod transaction_builder;
pub mod transfer_decoder;
pub mod transport;

pub use address::{normalize_address, to_checksum, validate_address};
pub use address_filter::AddressFilter;
pub use contract::{ContractMetadata, DEFAULT_TOKEN_ABI, TRANSFER_SELECTOR};
pub use monitor::{ChainNotification, MonitorHandle, TransactionMonitor, TransferCallback, WatchKind};
pub use rpc_client::{RpcBlock, RpcClient, RpcReceipt, RpcTransaction};
pub use status::{validate_transaction_hash, StatusResolver};
pub use submitter::TransactionSubmitter;
pub use transaction_builder::{parse_signer, BuiltTransaction, TransactionBuilder};
pub use transfer_decoder::TokenTransferDecoder;
pub use transport::{BlockTag, EthTransport};
