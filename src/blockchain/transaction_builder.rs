use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use std::str::FromStr;

use crate::blockchain::transport::{BlockTag, EthTransport};
use crate::config::TransactionConfig;
use crate::error::{ConfigError, SdkError, ValidationError};
use crate::logging::LogContext;

/// Parse a hex private key, with or without 0x prefix
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner, ConfigError> {
    PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
}

/// A signed, encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    /// `0x`-prefixed canonical encoding
    pub raw: String,
    pub nonce: u64,
}

/// Assembles and signs legacy transactions with the fixed gas parameters of the configuration
#[derive(Clone)]
pub struct TransactionBuilder {
    signer: PrivateKeySigner,
    config: TransactionConfig,
}

impl TransactionBuilder {
    pub fn new(signer: PrivateKeySigner, config: TransactionConfig) -> Self {
        Self { signer, config }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Read the pending nonce and sign a transaction.
    ///
    /// The nonce is never cached: every build asks the node again.
    pub async fn build(
        &self,
        transport: &dyn EthTransport,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<BuiltTransaction, SdkError> {
        // a zero value is only meaningful when the payload carries it
        if value.is_zero() && data.is_empty() {
            return Err(ValidationError::NonPositiveAmount("0".to_string()).into());
        }

        let nonce = transport
            .get_transaction_count(self.address(), BlockTag::Pending)
            .await?;

        let raw = self.sign(nonce, to, value, data)?;

        LogContext::new("transaction_builder", "build")
            .with_address(&to.to_checksum(None))
            .with_metadata("nonce", serde_json::json!(nonce))
            .debug(&format!("Built transaction with nonce {}", nonce));

        Ok(BuiltTransaction { raw, nonce })
    }

    /// Sign a transaction for an explicit nonce. No network access.
    pub fn sign(&self, nonce: u64, to: Address, value: U256, data: Bytes) -> Result<String, SdkError> {
        let tx = TxLegacy {
            chain_id: self.config.chain_id,
            nonce,
            gas_price: self.config.gas_price_wei as u128,
            gas_limit: self.config.gas_limit,
            to: TxKind::Call(to),
            value,
            input: data,
        };

        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| SdkError::Signing(e.to_string()))?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(format!("0x{}", hex::encode(envelope.encoded_2718())))
    }
}
