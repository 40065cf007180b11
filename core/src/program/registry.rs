use std::collections::HashSet;

use tracing::{debug, info};

use super::events::Event;
use crate::types::Address;

/// Addresses currently excluded from payouts. Absent means not banned.
///
/// Mutations are crate-private: the owner gate lives in
/// [`crate::program::GrantsProgram`].
#[derive(Debug, Clone, Default)]
pub struct MembershipRegistry {
    banned: HashSet<Address>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_banned(&self, addr: &Address) -> bool {
        self.banned.contains(addr)
    }

    pub fn banned_count(&self) -> usize {
        self.banned.len()
    }

    /// Ban `addr`. Already banned: no change, no record.
    pub(crate) fn disable(&mut self, addr: Address) -> Option<Event> {
        if !self.banned.insert(addr) {
            debug!(member = %addr, "member already disabled");
            return None;
        }
        info!(member = %addr, "member disabled");
        Some(Event::MemberDisabled { member: addr })
    }

    /// Lift the ban on `addr`. Not banned: no change, no record.
    pub(crate) fn enable(&mut self, addr: Address) -> Option<Event> {
        if !self.banned.remove(&addr) {
            debug!(member = %addr, "member already enabled");
            return None;
        }
        info!(member = %addr, "member enabled");
        Some(Event::MemberEnabled { member: addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_address_is_not_banned() {
        let reg = MembershipRegistry::new();
        assert!(!reg.is_banned(&Address([3; 20])));
    }

    #[test]
    fn test_disable_is_idempotent() {
        let mut reg = MembershipRegistry::new();
        let addr = Address([3; 20]);
        assert_eq!(reg.disable(addr), Some(Event::MemberDisabled { member: addr }));
        assert!(reg.is_banned(&addr));
        assert_eq!(reg.disable(addr), None);
        assert!(reg.is_banned(&addr));
        assert_eq!(reg.banned_count(), 1);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut reg = MembershipRegistry::new();
        let addr = Address([4; 20]);
        assert_eq!(reg.enable(addr), None);
        reg.disable(addr);
        assert_eq!(reg.enable(addr), Some(Event::MemberEnabled { member: addr }));
        assert!(!reg.is_banned(&addr));
        assert_eq!(reg.enable(addr), None);
    }
}
