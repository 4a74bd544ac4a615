#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use token_wallet_sdk::blockchain::contract::encode_transfer;
use token_wallet_sdk::blockchain::{
    validate_address, BlockTag, EthTransport, RpcBlock, RpcReceipt, RpcTransaction,
};
use token_wallet_sdk::config::{SdkConfig, DEFAULT_CONTRACT_ADDRESS};
use token_wallet_sdk::TransportError;

/// Well-known development key and its address
pub const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SENDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const OTHER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

pub const PENDING_FILTER_ID: &str = "0xf1";
pub const BLOCK_FILTER_ID: &str = "0xf2";

/// In-memory node that records every call and serves scripted answers
#[derive(Default)]
pub struct MockTransport {
    pub calls: Mutex<Vec<String>>,
    pub disconnected: AtomicBool,
    pub balances: Mutex<HashMap<Address, U256>>,
    pub call_result: Mutex<Vec<u8>>,
    pub nonce: AtomicU64,
    pub send_results: Mutex<VecDeque<Result<String, TransportError>>>,
    pub sent: Mutex<Vec<String>>,
    pub transactions: Mutex<HashMap<String, RpcTransaction>>,
    pub receipts: Mutex<HashMap<String, RpcReceipt>>,
    pub blocks: Mutex<HashMap<String, RpcBlock>>,
    pub pending_changes: Mutex<VecDeque<Vec<String>>>,
    pub block_changes: Mutex<VecDeque<Vec<String>>>,
    pub fail_next_poll: AtomicBool,
    pub uninstalled: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, method: &str) {
        self.calls.lock().unwrap().push(method.to_string());
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn script_send(&self, result: Result<String, TransportError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn insert_transaction(&self, tx: RpcTransaction) {
        self.transactions.lock().unwrap().insert(tx.hash.clone(), tx);
    }

    pub fn insert_receipt(&self, receipt: RpcReceipt) {
        self.receipts.lock().unwrap().insert(receipt.transaction_hash.clone(), receipt);
    }

    pub fn announce_pending<S: AsRef<str>>(&self, hashes: &[S]) {
        self.pending_changes
            .lock()
            .unwrap()
            .push_back(hashes.iter().map(|h| h.as_ref().to_string()).collect());
    }

    /// Store a block holding `transactions` and announce it on the block filter
    pub fn announce_block(&self, block_hash: &str, transactions: Vec<RpcTransaction>) {
        self.blocks.lock().unwrap().insert(
            block_hash.to_string(),
            RpcBlock {
                number: Some("0x10".to_string()),
                hash: Some(block_hash.to_string()),
                transactions,
            },
        );
        self.block_changes.lock().unwrap().push_back(vec![block_hash.to_string()]);
    }
}

#[async_trait]
impl EthTransport for MockTransport {
    async fn get_balance(&self, address: Address) -> Result<U256, TransportError> {
        self.record("eth_getBalance");
        Ok(self.balances.lock().unwrap().get(&address).copied().unwrap_or(U256::ZERO))
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, TransportError> {
        self.record("eth_call");
        let result = self.call_result.lock().unwrap().clone();
        if result.is_empty() {
            // a zero uint256
            return Ok(Bytes::from(vec![0u8; 32]));
        }
        Ok(Bytes::from(result))
    }

    async fn get_transaction_count(&self, _address: Address, tag: BlockTag) -> Result<u64, TransportError> {
        self.record("eth_getTransactionCount");
        assert_eq!(tag, BlockTag::Pending);
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn send_raw_transaction(&self, raw_transaction: &str) -> Result<String, TransportError> {
        self.record("eth_sendRawTransaction");
        let mut sent = self.sent.lock().unwrap();
        sent.push(raw_transaction.to_string());
        match self.send_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(tx_hash(sent.len() as u8)),
        }
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Option<RpcTransaction>, TransportError> {
        self.record("eth_getTransactionByHash");
        Ok(self.transactions.lock().unwrap().get(hash).cloned())
    }

    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, TransportError> {
        self.record("eth_getTransactionReceipt");
        Ok(self.receipts.lock().unwrap().get(hash).cloned())
    }

    async fn get_block_by_hash(&self, hash: &str) -> Result<Option<RpcBlock>, TransportError> {
        self.record("eth_getBlockByHash");
        Ok(self.blocks.lock().unwrap().get(hash).cloned())
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        self.record("eth_blockNumber");
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("connection refused".to_string()));
        }
        Ok(16)
    }

    async fn new_pending_transaction_filter(&self) -> Result<String, TransportError> {
        self.record("eth_newPendingTransactionFilter");
        Ok(PENDING_FILTER_ID.to_string())
    }

    async fn new_block_filter(&self) -> Result<String, TransportError> {
        self.record("eth_newBlockFilter");
        Ok(BLOCK_FILTER_ID.to_string())
    }

    async fn get_filter_changes(&self, filter_id: &str) -> Result<Vec<String>, TransportError> {
        self.record("eth_getFilterChanges");
        if filter_id == PENDING_FILTER_ID && self.fail_next_poll.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Rejected {
                code: -32000,
                message: "filter not found".to_string(),
            });
        }
        let queue = if filter_id == PENDING_FILTER_ID {
            &self.pending_changes
        } else {
            &self.block_changes
        };
        Ok(queue.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn uninstall_filter(&self, filter_id: &str) -> Result<bool, TransportError> {
        self.record("eth_uninstallFilter");
        self.uninstalled.lock().unwrap().push(filter_id.to_string());
        Ok(true)
    }
}

/// 32-byte transaction hash ending in `n`
pub fn tx_hash(n: u8) -> String {
    format!("0x{:064x}", n)
}

pub fn nonce_too_low() -> TransportError {
    TransportError::Rejected {
        code: -32000,
        message: "nonce too low".to_string(),
    }
}

/// Configuration tuned for fast tests
pub fn test_config(private_key: Option<&str>) -> SdkConfig {
    let mut config = SdkConfig::default();
    config.rpc.endpoint = "http://localhost:8545".to_string();
    config.wallet.private_key = private_key.map(str::to_string);
    config.transaction.nonce_retry_delay_ms = 1;
    config.monitor.poll_interval_ms = 10;
    config
}

pub fn plain_transaction(hash: &str, from: &str, to: &str, value_wei: u64) -> RpcTransaction {
    RpcTransaction {
        hash: hash.to_string(),
        from: from.to_lowercase(),
        to: Some(to.to_lowercase()),
        value: format!("0x{:x}", value_wei),
        gas: "0x15f90".to_string(),
        input: "0x".to_string(),
        block_number: None,
    }
}

/// `transfer(recipient, whole_tokens * 10^18)` sent to the default token contract
pub fn token_transaction(hash: &str, from: &str, recipient: &str, whole_tokens: u64) -> RpcTransaction {
    let amount = U256::from(whole_tokens) * U256::from(10u64).pow(U256::from(18u64));
    let data = encode_transfer(validate_address(recipient).unwrap(), amount);
    RpcTransaction {
        hash: hash.to_string(),
        from: from.to_lowercase(),
        to: Some(DEFAULT_CONTRACT_ADDRESS.to_string()),
        value: "0x0".to_string(),
        gas: "0x15f90".to_string(),
        input: format!("0x{}", hex::encode(&data)),
        block_number: None,
    }
}

pub fn mined(mut tx: RpcTransaction) -> RpcTransaction {
    tx.block_number = Some("0x10".to_string());
    tx
}

pub fn receipt(hash: &str, status: Option<&str>, gas_used: u64) -> RpcReceipt {
    RpcReceipt {
        transaction_hash: hash.to_string(),
        gas_used: format!("0x{:x}", gas_used),
        status: status.map(str::to_string),
        block_number: Some("0x10".to_string()),
    }
}
