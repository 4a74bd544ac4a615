use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::blockchain::address::{to_checksum, validate_address};
use crate::error::{ConfigError, TransportError};

sol! {
    interface IToken {
        function transfer(address to, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256 balance);
    }
}

/// Interface description of the production token contract
pub const DEFAULT_TOKEN_ABI: &str = include_str!("token_abi.json");

static DEFAULT_ABI_VALUE: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(DEFAULT_TOKEN_ABI).unwrap_or(Value::Null));

/// Canonical signatures the SDK calls on the configured contract
pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

/// 4-byte selector of `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = IToken::transferCall::SELECTOR;

/// Token contract address plus its validated interface description
#[derive(Debug, Clone)]
pub struct ContractMetadata {
    address: Address,
    abi: Value,
}

impl ContractMetadata {
    /// Validate the contract address and ABI.
    ///
    /// `abi` of `None` selects the built-in token ABI.
    pub fn new(address: &str, abi: Option<&str>) -> Result<Self, ConfigError> {
        if address.trim().is_empty() {
            return Err(ConfigError::MissingContractAddress);
        }
        let address = validate_address(address)
            .map_err(|e| ConfigError::InvalidContractAddress(e.to_string()))?;

        let abi = match abi {
            None => DEFAULT_ABI_VALUE.clone(),
            Some(raw) => {
                if raw.trim().is_empty() {
                    return Err(ConfigError::MissingAbi);
                }
                serde_json::from_str(raw).map_err(|e| ConfigError::InvalidAbi(e.to_string()))?
            }
        };
        validate_abi(&abi)?;

        Ok(Self { address, abi })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn checksum_address(&self) -> String {
        to_checksum(&self.address)
    }

    pub fn abi(&self) -> &Value {
        &self.abi
    }
}

/// Check the ABI shape: a non-empty array of entries that declares the methods the SDK calls
fn validate_abi(abi: &Value) -> Result<(), ConfigError> {
    let entries = abi
        .as_array()
        .ok_or_else(|| ConfigError::InvalidAbi("expected a JSON array".to_string()))?;

    if entries.is_empty() {
        return Err(ConfigError::MissingAbi);
    }

    let mut signatures = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let object = entry
            .as_object()
            .ok_or_else(|| ConfigError::InvalidAbi(format!("entry {} is not an object", index)))?;

        // "function" is the default entry type
        let entry_type = object.get("type").and_then(Value::as_str).unwrap_or("function");
        if entry_type == "function" {
            if let Some(signature) = function_signature(entry) {
                signatures.push(signature);
            }
        }
    }

    for required in [TRANSFER_SIGNATURE, BALANCE_OF_SIGNATURE] {
        if !signatures.iter().any(|s| s == required) {
            return Err(ConfigError::InvalidAbi(format!("missing function {}", required)));
        }
    }

    Ok(())
}

fn function_signature(entry: &Value) -> Option<String> {
    let name = entry.get("name")?.as_str()?;
    let inputs = match entry.get("inputs") {
        Some(inputs) => inputs.as_array()?.clone(),
        None => Vec::new(),
    };

    let mut types = Vec::with_capacity(inputs.len());
    for input in &inputs {
        types.push(input.get("type")?.as_str()?.to_string());
    }

    Some(format!("{}({})", name, types.join(",")))
}

pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    Bytes::from(IToken::transferCall { to, amount }.abi_encode())
}

pub fn encode_balance_of(owner: Address) -> Bytes {
    Bytes::from(IToken::balanceOfCall { owner }.abi_encode())
}

pub fn decode_balance(data: &[u8]) -> Result<U256, TransportError> {
    IToken::balanceOfCall::abi_decode_returns(data, true)
        .map(|decoded| decoded.balance)
        .map_err(|e| TransportError::InvalidResponse(format!("cannot decode balanceOf result: {}", e)))
}

/// Selector plus two 32-byte arguments
const TRANSFER_CALL_LEN: usize = 4 + 2 * 32;

/// Decode `transfer(address,uint256)` call data, including its selector.
///
/// Bytes after the two arguments are ignored, as the contract ignores them.
pub fn decode_transfer(data: &[u8]) -> Option<(Address, U256)> {
    if data.len() < TRANSFER_CALL_LEN {
        return None;
    }
    IToken::transferCall::abi_decode(&data[..TRANSFER_CALL_LEN], true)
        .ok()
        .map(|call| (call.to, call.amount))
}
