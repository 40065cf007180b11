use crate::error::{GrantsError, Result};
use crate::types::Amount;

/// Balance held by the program on behalf of the federation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FundsVault {
    balance: Amount,
}

impl FundsVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Accept incoming value. Ungated.
    pub(crate) fn receive(&mut self, amount: Amount) -> Result<Amount> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(GrantsError::AmountOverflow)?;
        Ok(self.balance)
    }

    pub(crate) fn debit(&mut self, amount: Amount) -> Result<()> {
        if self.balance < amount {
            return Err(GrantsError::InsufficientFunds {
                available: self.balance,
                needed: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Return a debit taken earlier in the same operation.
    pub(crate) fn refund(&mut self, amount: Amount) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Take the whole balance, leaving zero.
    pub(crate) fn drain(&mut self) -> Amount {
        std::mem::take(&mut self.balance)
    }
}
