//! Host seam for outbound value transfers.
//!
//! The program never touches recipient balances directly: payouts and
//! withdrawals go through [`Ledger::credit`], and a batch that fails part
//! way is unwound with [`Ledger::reclaim`] in reverse order.

use std::collections::{HashMap, HashSet};

use crate::error::TransferError;
use crate::types::{Address, Amount};

pub trait Ledger {
    /// Credit `amount` to `to`. A rejection leaves the ledger unchanged.
    fn credit(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Undo a credit this ledger accepted earlier in the same operation.
    fn reclaim(&mut self, from: &Address, amount: Amount);
}

/// In-memory balance book.
///
/// Addresses marked with [`MemoryLedger::set_rejecting`] refuse credits,
/// standing in for recipients that cannot receive value.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: HashMap<Address, Amount>,
    rejecting: HashSet<Address>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, addr: &Address) -> Amount {
        self.balances.get(addr).copied().unwrap_or(0)
    }

    /// Create balance out of thin air (test and simulation funding).
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let entry = self.balances.entry(*to).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow)?;
        Ok(())
    }

    pub fn debit(&mut self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                available,
                needed: amount,
            });
        }
        self.balances.insert(*from, available - amount);
        Ok(())
    }

    pub fn set_rejecting(&mut self, addr: Address, rejecting: bool) {
        if rejecting {
            self.rejecting.insert(addr);
        } else {
            self.rejecting.remove(&addr);
        }
    }

    pub fn is_rejecting(&self, addr: &Address) -> bool {
        self.rejecting.contains(addr)
    }
}

impl Ledger for MemoryLedger {
    fn credit(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError::Rejected);
        }
        self.mint(to, amount)
    }

    fn reclaim(&mut self, from: &Address, amount: Amount) {
        if let Some(balance) = self.balances.get_mut(from) {
            *balance = balance.saturating_sub(amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_reclaim() {
        let mut ledger = MemoryLedger::new();
        let a = Address([1; 20]);
        ledger.credit(&a, 10).unwrap();
        ledger.credit(&a, 5).unwrap();
        assert_eq!(ledger.balance_of(&a), 15);
        ledger.reclaim(&a, 5);
        assert_eq!(ledger.balance_of(&a), 10);
    }

    #[test]
    fn test_rejecting_recipient_is_unchanged() {
        let mut ledger = MemoryLedger::new();
        let a = Address([2; 20]);
        ledger.set_rejecting(a, true);
        assert_eq!(ledger.credit(&a, 1), Err(TransferError::Rejected));
        assert_eq!(ledger.balance_of(&a), 0);
        ledger.set_rejecting(a, false);
        assert!(ledger.credit(&a, 1).is_ok());
    }

    #[test]
    fn test_debit_requires_balance() {
        let mut ledger = MemoryLedger::new();
        let a = Address([3; 20]);
        ledger.mint(&a, 4).unwrap();
        assert_eq!(
            ledger.debit(&a, 5),
            Err(TransferError::InsufficientBalance { available: 4, needed: 5 })
        );
        ledger.debit(&a, 4).unwrap();
        assert_eq!(ledger.balance_of(&a), 0);
    }

    #[test]
    fn test_mint_overflow() {
        let mut ledger = MemoryLedger::new();
        let a = Address([4; 20]);
        ledger.mint(&a, Amount::MAX).unwrap();
        assert_eq!(ledger.mint(&a, 1), Err(TransferError::BalanceOverflow));
        assert_eq!(ledger.balance_of(&a), Amount::MAX);
    }
}
