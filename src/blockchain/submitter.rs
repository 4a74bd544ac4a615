use alloy::primitives::{Address, Bytes, U256};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::blockchain::transaction_builder::TransactionBuilder;
use crate::blockchain::transport::EthTransport;
use crate::error::SdkError;
use crate::logging::MetricsLogger;
use crate::retry::{RetryConfig, RetryManager};

/// Builds and submits transactions, rebuilding with a fresh nonce when the node reports a
/// nonce collision.
///
/// Retry on collision is the only cross-process guarantee. The optional send lock only
/// serializes sends issued through this instance.
pub struct TransactionSubmitter {
    builder: TransactionBuilder,
    transport: Arc<dyn EthTransport>,
    retry: RetryConfig,
    send_lock: Option<Mutex<()>>,
}

impl TransactionSubmitter {
    pub fn new(builder: TransactionBuilder, transport: Arc<dyn EthTransport>) -> Self {
        let retry = RetryConfig::for_nonce_collision(builder.config());
        let send_lock = builder.config().serialize_sends.then(|| Mutex::new(()));

        Self {
            builder,
            transport,
            retry,
            send_lock,
        }
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    /// Submit a transaction and return the hash reported by the node
    pub async fn submit(&self, to: Address, value: U256, data: Bytes) -> Result<String, SdkError> {
        let _guard = match &self.send_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let builder = &self.builder;
        let transport = self.transport.as_ref();
        let manager = RetryManager::new("send_transaction", self.retry.clone());

        let (tx_hash, nonce, attempts) = manager
            .execute_with_handler(
                |attempt| {
                    let data = data.clone();
                    async move {
                        let built = builder.build(transport, to, value, data).await?;
                        let tx_hash = transport.send_raw_transaction(&built.raw).await?;
                        Ok::<_, SdkError>((tx_hash, built.nonce, attempt))
                    }
                },
                |error, _| error.is_nonce_collision(),
            )
            .await?;

        MetricsLogger::log_transaction_submitted(&tx_hash, &to.to_checksum(None), nonce, attempts);
        Ok(tx_hash)
    }
}
