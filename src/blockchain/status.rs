use std::sync::Arc;

use crate::blockchain::rpc_client::{parse_hex_to_u64, RpcReceipt, RpcTransaction};
use crate::blockchain::transport::EthTransport;
use crate::error::{SdkError, TransportError, ValidationError};
use crate::logging::LogContext;
use crate::models::TransactionStatus;

/// Check that a transaction id is a 32-byte hex hash
pub fn validate_transaction_hash(hash: &str) -> Result<(), ValidationError> {
    let hex_part = hash
        .strip_prefix("0x")
        .ok_or_else(|| ValidationError::InvalidTransactionHash(hash.to_string()))?;

    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidTransactionHash(hash.to_string()));
    }
    Ok(())
}

/// Maps a transaction id to its lifecycle state.
///
/// Receipts without a status field are classified by comparing gas used with the gas limit.
/// That heuristic assumes the SDK's fixed, generous gas limit; when the limit was overridden
/// every legacy classification is logged as unreliable.
#[derive(Clone)]
pub struct StatusResolver {
    transport: Arc<dyn EthTransport>,
    gas_limit_overridden: bool,
}

impl StatusResolver {
    pub fn new(transport: Arc<dyn EthTransport>, gas_limit_overridden: bool) -> Self {
        Self {
            transport,
            gas_limit_overridden,
        }
    }

    pub async fn resolve(&self, tx_hash: &str) -> Result<TransactionStatus, SdkError> {
        let tx = match self.transport.get_transaction_by_hash(tx_hash).await? {
            Some(tx) => tx,
            None => return Ok(TransactionStatus::Unknown),
        };

        if !tx.is_mined() {
            return Ok(TransactionStatus::Pending);
        }

        Ok(self.resolve_mined(&tx).await?)
    }

    /// Status of a transaction already known to be in a block
    pub async fn resolve_mined(&self, tx: &RpcTransaction) -> Result<TransactionStatus, TransportError> {
        match self.transport.get_transaction_receipt(&tx.hash).await? {
            Some(receipt) => self.classify(tx, &receipt),
            // the node indexed the block but not yet the receipt
            None => Ok(TransactionStatus::Pending),
        }
    }

    pub fn classify(&self, tx: &RpcTransaction, receipt: &RpcReceipt) -> Result<TransactionStatus, TransportError> {
        if let Some(status) = receipt.status.as_deref() {
            return match parse_hex_to_u64(status)? {
                1 => Ok(TransactionStatus::Success),
                0 => Ok(TransactionStatus::Fail),
                other => Err(TransportError::InvalidResponse(format!(
                    "unexpected receipt status {} for {}",
                    other, tx.hash
                ))),
            };
        }

        if self.gas_limit_overridden {
            LogContext::new("status_resolver", "classify")
                .with_transaction_hash(&tx.hash)
                .warn("Receipt has no status field and the gas limit is overridden; gas heuristic may misclassify");
        }

        // failed pre-Byzantium transactions consume all their gas
        if receipt.gas_used()? < tx.gas_limit()? {
            Ok(TransactionStatus::Success)
        } else {
            Ok(TransactionStatus::Fail)
        }
    }
}
