use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::transport::{BlockTag, EthTransport};
use crate::error::TransportError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    /// `null` is a legitimate answer (unknown transaction, missing receipt)
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

fn zero_quantity() -> String {
    "0x0".to_string()
}

/// Transaction as returned by `eth_getTransactionByHash` and full-body blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcTransaction {
    pub hash: String,
    pub from: String,
    /// `None` for contract creations
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "zero_quantity")]
    pub value: String,
    /// Gas limit supplied with the transaction
    #[serde(default = "zero_quantity")]
    pub gas: String,
    #[serde(default, alias = "data")]
    pub input: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
}

impl RpcTransaction {
    pub fn value_wei(&self) -> Result<U256, TransportError> {
        parse_hex_to_u256(&self.value)
    }

    pub fn gas_limit(&self) -> Result<u64, TransportError> {
        parse_hex_to_u64(&self.gas)
    }

    /// True when the input carries contract-call data rather than the empty marker
    pub fn has_payload(&self) -> bool {
        !matches!(self.input.trim(), "" | "0x" | "0x0" | "0x00")
    }

    /// Decoded input bytes, `None` for empty or undecodable input
    pub fn payload(&self) -> Option<Vec<u8>> {
        if !self.has_payload() {
            return None;
        }
        let input = self.input.trim();
        hex::decode(input.strip_prefix("0x").unwrap_or(input)).ok()
    }

    /// Attached to a block. Some nodes report pending transactions with block number zero.
    pub fn is_mined(&self) -> bool {
        match self.block_number.as_deref() {
            Some(number) => parse_hex_to_u64(number).map(|n| n > 0).unwrap_or(false),
            None => false,
        }
    }
}

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    /// Absent on receipts produced before the Byzantium fork
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
}

impl RpcReceipt {
    pub fn gas_used(&self) -> Result<u64, TransportError> {
        parse_hex_to_u64(&self.gas_used)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcBlock {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

/// HTTP JSON-RPC client for an Ethereum node
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
    request_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(endpoint: String) -> Result<Self, TransportError> {
        Self::new_with_config(endpoint, 30)
    }

    /// Client with a custom request timeout and connection pooling
    pub fn new_with_config(endpoint: String, timeout_seconds: u64) -> Result<Self, TransportError> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", json!(endpoint))
            .with_metadata("timeout_seconds", json!(timeout_seconds));
        context.info("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            timeout_seconds,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let monitor = PerformanceMonitor::new(&format!("rpc_{}", method));
        let result = self.send_request(method, params).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());
        result
    }

    async fn send_request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout { seconds: self.timeout_seconds }
                } else if e.is_connect() {
                    TransportError::Connection(e.to_string())
                } else {
                    TransportError::Http(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimit { seconds: 60 });
        }
        if !status.is_success() {
            return Err(TransportError::Connection(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await?;
        let rpc_response: JsonRpcResponse = serde_json::from_str(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(TransportError::Rejected {
                code: error.code,
                message: error.message,
            });
        }

        Ok(rpc_response.result)
    }

    fn expect_str(value: &Value, what: &str) -> Result<String, TransportError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TransportError::InvalidResponse(format!("{} is not a string: {}", what, value)))
    }
}

fn address_param(address: &Address) -> Value {
    json!(format!("0x{}", hex::encode(address.as_slice())))
}

#[async_trait]
impl EthTransport for RpcClient {
    async fn get_balance(&self, address: Address) -> Result<U256, TransportError> {
        let result = self
            .make_request("eth_getBalance", vec![address_param(&address), json!("latest")])
            .await?;
        parse_hex_to_u256(&Self::expect_str(&result, "balance")?)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        let call = json!({
            "to": address_param(&to),
            "data": format!("0x{}", hex::encode(&data)),
        });
        let result = self.make_request("eth_call", vec![call, json!("latest")]).await?;
        let hex_string = Self::expect_str(&result, "call result")?;
        let decoded = hex::decode(hex_string.strip_prefix("0x").unwrap_or(&hex_string))
            .map_err(|e| TransportError::InvalidResponse(format!("call result is not hex: {}", e)))?;
        Ok(Bytes::from(decoded))
    }

    async fn get_transaction_count(&self, address: Address, tag: BlockTag) -> Result<u64, TransportError> {
        let result = self
            .make_request("eth_getTransactionCount", vec![address_param(&address), json!(tag.as_str())])
            .await?;
        parse_hex_to_u64(&Self::expect_str(&result, "transaction count")?)
    }

    async fn send_raw_transaction(&self, raw_transaction: &str) -> Result<String, TransportError> {
        let result = self
            .make_request("eth_sendRawTransaction", vec![json!(raw_transaction)])
            .await?;
        Self::expect_str(&result, "transaction hash")
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Option<RpcTransaction>, TransportError> {
        let result = self.make_request("eth_getTransactionByHash", vec![json!(hash)]).await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, TransportError> {
        let result = self.make_request("eth_getTransactionReceipt", vec![json!(hash)]).await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn get_block_by_hash(&self, hash: &str) -> Result<Option<RpcBlock>, TransportError> {
        let result = self
            .make_request("eth_getBlockByHash", vec![json!(hash), json!(true)])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let block: RpcBlock = serde_json::from_value(result)?;

        LogContext::new("rpc_client", "get_block_by_hash")
            .with_block_hash(hash)
            .with_metadata("transaction_count", json!(block.transactions.len()))
            .debug(&format!("Retrieved block {} with {} transactions", hash, block.transactions.len()));

        Ok(Some(block))
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let result = self.make_request("eth_blockNumber", vec![]).await?;
        parse_hex_to_u64(&Self::expect_str(&result, "block number")?)
    }

    async fn new_pending_transaction_filter(&self) -> Result<String, TransportError> {
        let result = self.make_request("eth_newPendingTransactionFilter", vec![]).await?;
        Self::expect_str(&result, "filter id")
    }

    async fn new_block_filter(&self) -> Result<String, TransportError> {
        let result = self.make_request("eth_newBlockFilter", vec![]).await?;
        Self::expect_str(&result, "filter id")
    }

    async fn get_filter_changes(&self, filter_id: &str) -> Result<Vec<String>, TransportError> {
        let result = self.make_request("eth_getFilterChanges", vec![json!(filter_id)]).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    async fn uninstall_filter(&self, filter_id: &str) -> Result<bool, TransportError> {
        let result = self.make_request("eth_uninstallFilter", vec![json!(filter_id)]).await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

pub fn parse_hex_to_u64(hex_str: &str) -> Result<u64, TransportError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if hex_without_prefix.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| TransportError::InvalidResponse(format!("Failed to parse hex '{}' to u64: {}", hex_str, e)))
}

pub fn parse_hex_to_u256(hex_str: &str) -> Result<U256, TransportError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if hex_without_prefix.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| TransportError::InvalidResponse(format!("Failed to parse hex '{}' to U256: {}", hex_str, e)))
}
