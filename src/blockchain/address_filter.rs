use crate::blockchain::address::{normalize_address, validate_address};
use crate::error::ValidationError;

/// A from/to address pair that observed transactions are matched against.
///
/// A side that is set must match; a side that is unset matches anything. At least one side
/// is always set. Addresses are stored normalized so chain data in any case compares equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFilter {
    from: Option<String>,
    to: Option<String>,
}

impl AddressFilter {
    pub fn new(from_address: Option<&str>, to_address: Option<&str>) -> Result<Self, ValidationError> {
        let from_address = from_address.filter(|a| !a.trim().is_empty());
        let to_address = to_address.filter(|a| !a.trim().is_empty());

        if from_address.is_none() && to_address.is_none() {
            return Err(ValidationError::MissingFilterBounds);
        }

        let from = match from_address {
            Some(address) => {
                validate_address(address)?;
                Some(normalize_address(address))
            }
            None => None,
        };
        let to = match to_address {
            Some(address) => {
                validate_address(address)?;
                Some(normalize_address(address))
            }
            None => None,
        };

        Ok(Self { from, to })
    }

    /// Check a transaction's sender and recipient against the filter.
    ///
    /// `to` is `None` for contract creations, which never match a filter with a recipient.
    pub fn matches(&self, from: &str, to: Option<&str>) -> bool {
        let from_matches = match &self.from {
            Some(expected) => normalize_address(from) == *expected,
            None => true,
        };
        let to_matches = match (&self.to, to) {
            (Some(expected), Some(actual)) => normalize_address(actual) == *expected,
            (Some(_), None) => false,
            (None, _) => true,
        };

        from_matches && to_matches
    }

    pub fn from_address(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to_address(&self) -> Option<&str> {
        self.to.as_deref()
    }
}
