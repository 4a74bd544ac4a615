use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a transaction.
///
/// Ordinal values are meaningful: `>= Pending` means observed, `> Pending` means final.
/// `Fail` is a terminal sibling of `Success`, not a later stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum TransactionStatus {
    /// The node has no record of the transaction
    Unknown = 0,
    /// Known, not yet included in a block
    Pending = 1,
    /// Included and executed without revert
    Success = 2,
    /// Included and reverted, or judged failed by the legacy gas heuristic
    Fail = 3,
}

impl TransactionStatus {
    pub fn is_observed(&self) -> bool {
        *self >= TransactionStatus::Pending
    }

    pub fn is_final(&self) -> bool {
        *self > TransactionStatus::Pending
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Unknown => "UNKNOWN",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a matching transaction, handed to monitor callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub from_address: String,
    /// Logical recipient; for token transfers this is the decoded recipient, not the contract
    pub to_address: String,
    /// Decimal amount in whole units
    pub amount: String,
    pub is_token: bool,
}

/// A token transfer decoded from a contract-call payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub transaction_id: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
}

impl TokenTransfer {
    pub fn into_event(self, status: TransactionStatus) -> TransferEvent {
        TransferEvent {
            transaction_id: self.transaction_id,
            status,
            from_address: self.from_address,
            to_address: self.to_address,
            amount: self.amount,
            is_token: true,
        }
    }
}
