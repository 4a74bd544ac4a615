use crate::blockchain::address::{display_address, normalize_address, to_checksum};
use crate::blockchain::address_filter::AddressFilter;
use crate::blockchain::contract::{decode_transfer, ContractMetadata, TRANSFER_SELECTOR};
use crate::blockchain::rpc_client::RpcTransaction;
use crate::models::{format_amount, TokenTransfer};

/// Recognizes `transfer(address,uint256)` calls on the configured token contract.
///
/// Runs on every observed transaction, so every mismatch is a silent `None`.
#[derive(Debug, Clone)]
pub struct TokenTransferDecoder {
    contract_address: String,
    decimals: u8,
}

impl TokenTransferDecoder {
    pub fn new(contract: &ContractMetadata, decimals: u8) -> Self {
        Self {
            contract_address: normalize_address(&contract.checksum_address()),
            decimals,
        }
    }

    /// Decode the logical token transfer carried by a transaction
    pub fn decode(&self, tx: &RpcTransaction) -> Option<TokenTransfer> {
        let to = tx.to.as_deref()?;
        if normalize_address(to) != self.contract_address {
            return None;
        }

        let payload = tx.payload()?;
        if payload.len() < TRANSFER_SELECTOR.len() || payload[..4] != TRANSFER_SELECTOR {
            return None;
        }

        let (recipient, amount) = decode_transfer(&payload)?;

        Some(TokenTransfer {
            transaction_id: tx.hash.clone(),
            from_address: display_address(&tx.from),
            to_address: to_checksum(&recipient),
            amount: format_amount(amount, self.decimals),
        })
    }

    /// Decode and apply the filter to the sender and the decoded recipient
    pub fn decode_matching(&self, tx: &RpcTransaction, filter: &AddressFilter) -> Option<TokenTransfer> {
        let transfer = self.decode(tx)?;
        if filter.matches(&transfer.from_address, Some(&transfer.to_address)) {
            Some(transfer)
        } else {
            None
        }
    }
}
