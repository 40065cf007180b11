//! Error taxonomy for the grants program.
//!
//! Every variant aborts the enclosing operation with no partial state
//! change. Idempotent no-ops (re-banning a banned member, paying while no
//! federator is due) are not errors and never surface here.

use thiserror::Error;

use crate::types::{Address, Amount};

pub type Result<T, E = GrantsError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantsError {
    /// Caller of a gated operation is not the owner
    #[error("caller {caller} is not the program owner")]
    Unauthorized { caller: Address },

    #[error("public key must be 33 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("public key prefix must be 0x02 or 0x03, got 0x{0:02x}")]
    InvalidPublicKeyPrefix(u8),

    /// The x-coordinate has no matching y on secp256k1
    #[error("public key does not encode a secp256k1 point")]
    InvalidCurvePoint,

    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    #[error("address must be 20 bytes, got {0}")]
    InvalidAddressLength(usize),

    /// Zero period or zero amount
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("insufficient funds: have {available}, need {needed}")]
    InsufficientFunds { available: Amount, needed: Amount },

    #[error("transfer of {amount} to {to} failed: {reason}")]
    TransferFailure {
        to: Address,
        amount: Amount,
        reason: TransferError,
    },

    #[error("federator index {index} out of range (roster has {len})")]
    FederatorIndexOutOfRange { index: usize, len: usize },

    #[error("amount overflow")]
    AmountOverflow,
}

/// Failure reported by a [`crate::ledger::Ledger`] when crediting a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("recipient rejected the transfer")]
    Rejected,

    #[error("recipient balance would overflow")]
    BalanceOverflow,

    #[error("sender balance {available} is below {needed}")]
    InsufficientBalance { available: Amount, needed: Amount },
}
