use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;

use crate::blockchain::address::{to_checksum, validate_address};
use crate::blockchain::address_filter::AddressFilter;
use crate::blockchain::contract::{decode_balance, encode_balance_of, encode_transfer, ContractMetadata};
use crate::blockchain::monitor::{MonitorHandle, TransactionMonitor, TransferCallback, WatchKind};
use crate::blockchain::rpc_client::RpcClient;
use crate::blockchain::status::{validate_transaction_hash, StatusResolver};
use crate::blockchain::submitter::TransactionSubmitter;
use crate::blockchain::transaction_builder::{parse_signer, TransactionBuilder};
use crate::blockchain::transfer_decoder::TokenTransferDecoder;
use crate::blockchain::transport::EthTransport;
use crate::config::SdkConfig;
use crate::error::{ConfigError, Result, SdkError};
use crate::logging::LogContext;
use crate::models::{format_amount, parse_amount, TransactionStatus, TransferEvent, ETHER_DECIMALS};

const NOT_CONFIGURED: &str = "address not configured";

/// Wallet and token operations against one node and one token contract.
///
/// Without a private key the instance is anonymous: operations on its own address and
/// sends fail with `SdkError::NotConfigured`.
pub struct TokenSdk {
    transport: Arc<dyn EthTransport>,
    contract: ContractMetadata,
    decimals: u8,
    submitter: Option<TransactionSubmitter>,
    resolver: StatusResolver,
    monitor: TransactionMonitor,
}

impl TokenSdk {
    /// Connect to the configured HTTP endpoint
    pub async fn new(config: SdkConfig) -> Result<Self> {
        config.validate()?;
        let client = RpcClient::new_with_config(config.rpc.endpoint.clone(), config.rpc.timeout_seconds)
            .map_err(|e| ConfigError::Connection(e.to_string()))?;
        Self::with_transport(Arc::new(client), config).await
    }

    /// Use an already constructed transport ("provider"); the endpoint setting is ignored
    pub async fn with_transport(transport: Arc<dyn EthTransport>, config: SdkConfig) -> Result<Self> {
        config.validate_settings()?;
        let contract = ContractMetadata::new(&config.contract.address, config.contract.abi.as_deref())?;

        let signer: Option<PrivateKeySigner> = match config.wallet.private_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(parse_signer(key)?),
            _ => None,
        };

        if !transport.is_connected().await {
            return Err(ConfigError::Connection("node did not answer eth_blockNumber".to_string()).into());
        }

        let gas_limit_overridden = config.transaction.gas_limit_overridden();
        if gas_limit_overridden {
            LogContext::new("sdk", "initialization")
                .with_metadata("gas_limit", serde_json::json!(config.transaction.gas_limit))
                .warn("Gas limit overridden; status of receipts without a status field becomes unreliable");
        }

        let resolver = StatusResolver::new(Arc::clone(&transport), gas_limit_overridden);
        let decoder = TokenTransferDecoder::new(&contract, config.contract.decimals);
        let monitor = TransactionMonitor::new(
            Arc::clone(&transport),
            decoder,
            resolver.clone(),
            config.monitor.clone(),
        );
        let submitter = signer.map(|signer| {
            TransactionSubmitter::new(
                TransactionBuilder::new(signer, config.transaction.clone()),
                Arc::clone(&transport),
            )
        });

        let context = LogContext::new("sdk", "initialization")
            .with_metadata("contract", serde_json::json!(contract.checksum_address()))
            .with_metadata(
                "abi_entries",
                serde_json::json!(contract.abi().as_array().map_or(0, Vec::len)),
            )
            .with_metadata("anonymous", serde_json::json!(submitter.is_none()));
        context.info("Token SDK initialized");

        Ok(Self {
            transport,
            contract,
            decimals: config.contract.decimals,
            submitter,
            resolver,
            monitor,
        })
    }

    fn submitter(&self) -> Result<&TransactionSubmitter> {
        self.submitter
            .as_ref()
            .ok_or_else(|| SdkError::NotConfigured(NOT_CONFIGURED.to_string()))
    }

    fn own_address(&self) -> Result<Address> {
        Ok(self.submitter()?.builder().address())
    }

    pub fn is_anonymous(&self) -> bool {
        self.submitter.is_none()
    }

    /// Checksummed address of the configured key
    pub fn get_address(&self) -> Result<String> {
        Ok(to_checksum(&self.own_address()?))
    }

    pub async fn get_ether_balance(&self) -> Result<String> {
        let address = self.own_address()?;
        self.ether_balance(address).await
    }

    pub async fn get_token_balance(&self) -> Result<String> {
        let address = self.own_address()?;
        self.token_balance(address).await
    }

    pub async fn get_address_ether_balance(&self, address: &str) -> Result<String> {
        let address = validate_address(address)?;
        self.ether_balance(address).await
    }

    pub async fn get_address_token_balance(&self, address: &str) -> Result<String> {
        let address = validate_address(address)?;
        self.token_balance(address).await
    }

    async fn ether_balance(&self, address: Address) -> Result<String> {
        let balance = self.transport.get_balance(address).await?;
        Ok(format_amount(balance, ETHER_DECIMALS))
    }

    async fn token_balance(&self, address: Address) -> Result<String> {
        let result = self
            .transport
            .call(self.contract.address(), encode_balance_of(address))
            .await?;
        Ok(format_amount(decode_balance(&result)?, self.decimals))
    }

    /// Send `amount` ether (whole units) and return the transaction hash
    pub async fn send_ether(&self, address: &str, amount: &str) -> Result<String> {
        let submitter = self.submitter()?;
        let to = validate_address(address)?;
        let value = parse_amount(amount, ETHER_DECIMALS)?;

        submitter.submit(to, value, Bytes::new()).await
    }

    /// Send `amount` tokens (whole units) through the token contract's `transfer`
    pub async fn send_tokens(&self, address: &str, amount: &str) -> Result<String> {
        let submitter = self.submitter()?;
        let to = validate_address(address)?;
        let value = parse_amount(amount, self.decimals)?;

        submitter
            .submit(self.contract.address(), U256::ZERO, encode_transfer(to, value))
            .await
    }

    pub async fn get_transaction_status(&self, tx_id: &str) -> Result<TransactionStatus> {
        validate_transaction_hash(tx_id)?;
        self.resolver.resolve(tx_id).await
    }

    /// Report plain ether transfers matching the filter, pending and mined
    pub async fn monitor_ether_transactions<F>(
        &self,
        callback: F,
        from_address: Option<&str>,
        to_address: Option<&str>,
    ) -> Result<MonitorHandle>
    where
        F: Fn(TransferEvent) + Send + Sync + 'static,
    {
        self.monitor(WatchKind::Ether, Arc::new(callback), from_address, to_address).await
    }

    /// Report token transfers matching the filter; the filter's `to` side matches the token recipient
    pub async fn monitor_token_transactions<F>(
        &self,
        callback: F,
        from_address: Option<&str>,
        to_address: Option<&str>,
    ) -> Result<MonitorHandle>
    where
        F: Fn(TransferEvent) + Send + Sync + 'static,
    {
        self.monitor(WatchKind::Token, Arc::new(callback), from_address, to_address).await
    }

    async fn monitor(
        &self,
        kind: WatchKind,
        callback: TransferCallback,
        from_address: Option<&str>,
        to_address: Option<&str>,
    ) -> Result<MonitorHandle> {
        let filter = AddressFilter::new(from_address, to_address)?;
        Ok(self.monitor.watch(kind, filter, callback).await)
    }

    /// Cancel every watcher and release the node subscriptions
    pub async fn stop_monitoring(&self) {
        self.monitor.stop().await;
    }

    pub async fn is_monitoring(&self) -> bool {
        self.monitor.is_running().await
    }
}
