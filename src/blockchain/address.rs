use alloy::primitives::Address;
use std::str::FromStr;

use crate::error::ValidationError;

/// Normalize an Ethereum address to lowercase without 0x prefix
pub fn normalize_address(address: &str) -> String {
    let addr = address.trim();
    if addr.starts_with("0x") || addr.starts_with("0X") {
        addr[2..].to_lowercase()
    } else {
        addr.to_lowercase()
    }
}

/// Validate an Ethereum address and parse it.
///
/// All-lowercase and all-uppercase hex are accepted as-is; mixed case must carry a valid
/// EIP-55 checksum.
pub fn validate_address(address: &str) -> Result<Address, ValidationError> {
    let address = address.trim();

    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| ValidationError::InvalidAddress(format!("'{}' must start with 0x", address)))?;

    if hex_part.len() != 40 {
        return Err(ValidationError::InvalidAddress(
            format!("'{}' must have 40 hex characters, got {}", address, hex_part.len())
        ));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress(
            format!("'{}' contains non-hexadecimal characters", address)
        ));
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    let prefixed = format!("0x{}", hex_part);

    if has_lower && has_upper {
        Address::parse_checksummed(&prefixed, None)
            .map_err(|_| ValidationError::InvalidAddress(format!("'{}' has an invalid checksum", address)))
    } else {
        Address::from_str(&prefixed)
            .map_err(|e| ValidationError::InvalidAddress(format!("'{}': {}", address, e)))
    }
}

/// EIP-55 checksummed form of an address
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Checksummed form of an address reported by the node; unparseable input is returned unchanged
pub fn display_address(address: &str) -> String {
    match validate_address(address) {
        Ok(parsed) => to_checksum(&parsed),
        Err(_) => address.to_string(),
    }
}
