use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::blockchain::rpc_client::{RpcBlock, RpcReceipt, RpcTransaction};
use crate::error::TransportError;

/// Block tag used for state reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    /// Latest block plus the node's pending pool
    Pending,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        }
    }
}

/// Node access used by every SDK component.
///
/// `RpcClient` implements it over HTTP JSON-RPC; any other provider can be injected through
/// `TokenSdk::with_transport`. Errors are returned unmodified to SDK callers.
#[async_trait]
pub trait EthTransport: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, TransportError>;

    /// Read-only contract call against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError>;

    async fn get_transaction_count(&self, address: Address, tag: BlockTag) -> Result<u64, TransportError>;

    /// Submit a `0x`-prefixed signed transaction and return its hash
    async fn send_raw_transaction(&self, raw_transaction: &str) -> Result<String, TransportError>;

    /// `None` when the node has no record of the transaction
    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Option<RpcTransaction>, TransportError>;

    /// `None` while the transaction is not mined
    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, TransportError>;

    /// Block with full transaction bodies
    async fn get_block_by_hash(&self, hash: &str) -> Result<Option<RpcBlock>, TransportError>;

    async fn block_number(&self) -> Result<u64, TransportError>;

    async fn new_pending_transaction_filter(&self) -> Result<String, TransportError>;

    async fn new_block_filter(&self) -> Result<String, TransportError>;

    /// Hashes observed by a filter since the previous poll
    async fn get_filter_changes(&self, filter_id: &str) -> Result<Vec<String>, TransportError>;

    async fn uninstall_filter(&self, filter_id: &str) -> Result<bool, TransportError>;

    /// Connectivity probe used at SDK construction
    async fn is_connected(&self) -> bool {
        self.block_number().await.is_ok()
    }
}
