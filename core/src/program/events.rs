use serde::Serialize;

use crate::types::{Address, Amount};

/// Structured record emitted by a successful mutation.
///
/// Each operation returns the records it emitted, in emission order; the
/// program also appends them to its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    MemberDisabled {
        member: Address,
    },
    MemberEnabled {
        member: Address,
    },
    FederatorPaid {
        #[serde(rename = "fedAddress")]
        fed_address: Address,
        amount: Amount,
    },
    LogWithdrawal {
        recipient: Address,
        amount: Amount,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::MemberDisabled { .. } => "MemberDisabled",
            Event::MemberEnabled { .. } => "MemberEnabled",
            Event::FederatorPaid { .. } => "FederatorPaid",
            Event::LogWithdrawal { .. } => "LogWithdrawal",
        }
    }

    /// Recipient of a `FederatorPaid` record.
    pub fn paid_to(&self) -> Option<&Address> {
        match self {
            Event::FederatorPaid { fed_address, .. } => Some(fed_address),
            _ => None,
        }
    }
}
