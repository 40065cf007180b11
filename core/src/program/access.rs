use tracing::warn;

use crate::error::{GrantsError, Result};
use crate::types::Address;

/// Single-owner gate. The owner is fixed at construction; there is no
/// transfer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessControl {
    owner: Address,
}

impl AccessControl {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        *caller == self.owner
    }

    /// First step of every gated mutation. Has no side effects.
    pub fn ensure_owner(&self, caller: &Address, operation: &str) -> Result<()> {
        if self.is_owner(caller) {
            return Ok(());
        }
        warn!(%caller, operation, "rejected call from non-owner");
        Err(GrantsError::Unauthorized { caller: *caller })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_passes_gate() {
        let owner = Address([9; 20]);
        let gate = AccessControl::new(owner);
        assert!(gate.is_owner(&owner));
        assert!(gate.ensure_owner(&owner, "disable").is_ok());
    }

    #[test]
    fn test_stranger_is_unauthorized() {
        let gate = AccessControl::new(Address([9; 20]));
        let stranger = Address([1; 20]);
        assert!(!gate.is_owner(&stranger));
        assert_eq!(
            gate.ensure_owner(&stranger, "disable"),
            Err(GrantsError::Unauthorized { caller: stranger })
        );
    }
}
