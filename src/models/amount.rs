use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::error::ValidationError;

/// Ether has 18 decimals
pub const ETHER_DECIMALS: u8 = 18;

/// Parse a whole-unit decimal string ("0.001") into base units.
///
/// The amount must be strictly positive.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ValidationError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidAmount("empty amount".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(ValidationError::NonPositiveAmount(trimmed.to_string()));
    }

    // parse_units would silently truncate extra fractional digits
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(ValidationError::InvalidAmount(format!(
                "'{}' has more than {} fractional digits",
                trimmed, decimals
            )));
        }
    }

    let value = parse_units(trimmed, decimals)
        .map_err(|e| ValidationError::InvalidAmount(format!("'{}': {}", trimmed, e)))?
        .get_absolute();

    if value.is_zero() {
        return Err(ValidationError::NonPositiveAmount(trimmed.to_string()));
    }

    Ok(value)
}

/// Format base units as a whole-unit decimal string without trailing zeros
pub fn format_amount(value: U256, decimals: u8) -> String {
    match format_units(value, decimals) {
        Ok(formatted) => trim_fraction(&formatted),
        Err(_) => value.to_string(),
    }
}

fn trim_fraction(formatted: &str) -> String {
    if !formatted.contains('.') {
        return formatted.to_string();
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
