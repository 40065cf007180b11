//! Federation grants program.
//!
//! Composition of the five components:
//!
//! 1. **Key codec** (`crate::crypto`): compressed key to payable address
//! 2. **Access control**: single owner gate for every administrative call
//! 3. **Membership registry**: banned addresses
//! 4. **Payout scheduler**: period, amount, payment clock, roster
//! 5. **Funds vault**: program balance, full withdrawal
//!
//! Every mutation takes a [`CallContext`] and returns the events it emitted.
//! A failed mutation leaves no trace: the owner gate runs first, inputs are
//! validated before any write, and payouts use a staged commit that unwinds
//! applied credits if a later transfer is rejected.

pub mod access;
pub mod events;
pub mod registry;
pub mod scheduler;
pub mod vault;

pub use access::AccessControl;
pub use events::Event;
pub use registry::MembershipRegistry;
pub use scheduler::{Federator, PayoutPlan, PayoutScheduler};
pub use vault::FundsVault;

use tracing::{debug, info, warn};

use crate::config::DeploymentParams;
use crate::crypto;
use crate::error::{GrantsError, Result};
use crate::ledger::Ledger;
use crate::types::{
    Address, Amount, CallContext, CompressedPublicKey, DecompressedPublicKey, Timestamp,
};

#[derive(Debug, Clone)]
pub struct GrantsProgram {
    access: AccessControl,
    registry: MembershipRegistry,
    scheduler: PayoutScheduler,
    vault: FundsVault,
    history: Vec<Event>,
}

impl GrantsProgram {
    /// Build a program. Fails on zero period, zero amount, or any key that
    /// does not decompress.
    pub fn new<I>(owner: Address, period_length: u64, amount_to_pay: Amount, feds_pub_keys: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let scheduler = PayoutScheduler::new(period_length, amount_to_pay, feds_pub_keys)?;
        info!(
            %owner,
            period_length,
            amount_to_pay = %amount_to_pay,
            federators = scheduler.federator_count(),
            "grants program created"
        );
        Ok(Self {
            access: AccessControl::new(owner),
            registry: MembershipRegistry::new(),
            scheduler,
            vault: FundsVault::new(),
            history: Vec::new(),
        })
    }

    pub fn from_params(params: &DeploymentParams) -> Result<Self> {
        Self::new(
            params.owner,
            params.period_length,
            params.amount_to_pay,
            &params.feds_pub_keys,
        )
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn period_length(&self) -> u64 {
        self.scheduler.period_length()
    }

    pub fn amount_to_pay(&self) -> Amount {
        self.scheduler.amount_to_pay()
    }

    pub fn fed_pub_keys(&self, index: usize) -> Result<&CompressedPublicKey> {
        self.scheduler.fed_pub_key(index)
    }

    pub fn federators(&self) -> &[Federator] {
        self.scheduler.federators()
    }

    pub fn federator_count(&self) -> usize {
        self.scheduler.federator_count()
    }

    pub fn is_banned(&self, addr: &Address) -> bool {
        self.registry.is_banned(addr)
    }

    pub fn required_funds(&self) -> Amount {
        self.scheduler.required_funds()
    }

    pub fn balance(&self) -> Amount {
        self.vault.balance()
    }

    pub fn last_payment(&self) -> Timestamp {
        self.scheduler.last_payment()
    }

    pub fn next_payout_at(&self) -> Option<Timestamp> {
        self.scheduler.next_payout_at(&self.registry)
    }

    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.scheduler.is_ready(now, &self.registry)
    }

    pub fn decompress(&self, key: &[u8]) -> Result<DecompressedPublicKey> {
        crypto::decompress(key)
    }

    pub fn address_from_public_key(&self, key: &[u8]) -> Result<Address> {
        crypto::address_from_public_key(key)
    }

    pub fn scheduler(&self) -> &PayoutScheduler {
        &self.scheduler
    }

    /// Every event emitted since construction, oldest first.
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    pub fn update_period_length(&mut self, ctx: &CallContext, period_length: u64) -> Result<Vec<Event>> {
        self.access.ensure_owner(&ctx.caller, "update_period_length")?;
        self.scheduler.set_period_length(period_length)?;
        Ok(Vec::new())
    }

    pub fn update_amount_to_pay(&mut self, ctx: &CallContext, amount: Amount) -> Result<Vec<Event>> {
        self.access.ensure_owner(&ctx.caller, "update_amount_to_pay")?;
        self.scheduler.set_amount_to_pay(amount)?;
        Ok(Vec::new())
    }

    /// Replace the roster. Every key is decompressed before the swap; one
    /// bad key rejects the whole update.
    pub fn update_feds_pub_keys<I>(&mut self, ctx: &CallContext, keys: I) -> Result<Vec<Event>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.access.ensure_owner(&ctx.caller, "update_feds_pub_keys")?;
        self.scheduler.replace_federators(keys)?;
        Ok(Vec::new())
    }

    pub fn disable(&mut self, ctx: &CallContext, member: Address) -> Result<Vec<Event>> {
        self.access.ensure_owner(&ctx.caller, "disable")?;
        let events = self.registry.disable(member).into_iter().collect();
        Ok(self.record(events))
    }

    pub fn enable(&mut self, ctx: &CallContext, member: Address) -> Result<Vec<Event>> {
        self.access.ensure_owner(&ctx.caller, "enable")?;
        let events = self.registry.enable(member).into_iter().collect();
        Ok(self.record(events))
    }

    // -----------------------------------------------------------------------
    // Funds
    // -----------------------------------------------------------------------

    /// Accept value from anyone. Returns the new balance.
    pub fn receive(&mut self, ctx: &CallContext, amount: Amount) -> Result<Amount> {
        let balance = self.vault.receive(amount)?;
        debug!(from = %ctx.caller, amount = %amount, balance = %balance, "funds received");
        Ok(balance)
    }

    /// Pay every due, non-banned federator `amount_to_pay`.
    ///
    /// No federator due: succeeds with no events. Otherwise the whole batch
    /// must be covered by the vault, the clock advances before the first
    /// transfer, and a rejected transfer unwinds everything.
    pub fn payout<L>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<Vec<Event>>
    where
        L: Ledger + ?Sized,
    {
        let plan = self.scheduler.plan(ctx.now, &self.registry)?;
        if plan.is_empty() {
            if self.scheduler.close_empty_cycle(ctx.now) {
                info!(now = ctx.now, "payout cycle closed with no eligible federator");
            } else {
                debug!(now = ctx.now, "payout skipped: no federator is due");
            }
            return Ok(Vec::new());
        }

        if let Err(e) = self.vault.debit(plan.total) {
            warn!(needed = %plan.total, available = %self.vault.balance(), "payout rejected: insufficient funds");
            return Err(e);
        }
        let checkpoint = self.scheduler.begin_cycle(ctx.now, &plan);

        for (i, to) in plan.recipients.iter().enumerate() {
            if let Err(reason) = ledger.credit(to, plan.amount_each) {
                warn!(recipient = %to, %reason, paid = i, "payout transfer rejected, rolling back");
                for done in plan.recipients[..i].iter().rev() {
                    ledger.reclaim(done, plan.amount_each);
                }
                self.vault.refund(plan.total);
                self.scheduler.restore(checkpoint);
                return Err(GrantsError::TransferFailure {
                    to: *to,
                    amount: plan.amount_each,
                    reason,
                });
            }
        }

        info!(
            now = ctx.now,
            federators = plan.recipients.len(),
            total = %plan.total,
            "federation paid"
        );
        let events = plan
            .recipients
            .iter()
            .map(|addr| Event::FederatorPaid {
                fed_address: *addr,
                amount: plan.amount_each,
            })
            .collect();
        Ok(self.record(events))
    }

    /// Send the entire vault balance to `to`.
    pub fn withdraw_funds<L>(&mut self, ctx: &CallContext, to: Address, ledger: &mut L) -> Result<Vec<Event>>
    where
        L: Ledger + ?Sized,
    {
        self.access.ensure_owner(&ctx.caller, "withdraw_funds")?;
        let amount = self.vault.drain();
        if let Err(reason) = ledger.credit(&to, amount) {
            self.vault.refund(amount);
            warn!(recipient = %to, %reason, "withdrawal rejected");
            return Err(GrantsError::TransferFailure { to, amount, reason });
        }
        info!(recipient = %to, amount = %amount, "funds withdrawn");
        Ok(self.record(vec![Event::LogWithdrawal { recipient: to, amount }]))
    }

    fn record(&mut self, events: Vec<Event>) -> Vec<Event> {
        self.history.extend(events.iter().cloned());
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    const KEYS: [&str; 3] = [
        "0x0368fd0a659e0e1e56752b093f9ef2bf529f0ba0c336b05660d1739c5803c48d74",
        "0x0385f60a249ebad9b736499f72114c32a40aa4fc213dd71a3051a0b72d73812647",
        "0x03115116d980d5f02c0ae98a2374598df0969c96f5f7cad6ac559020ef57eac249",
    ];

    const OWNER: Address = Address([0xaa; 20]);
    const STRANGER: Address = Address([0xbb; 20]);

    fn keys() -> Vec<CompressedPublicKey> {
        KEYS.iter().map(|k| k.parse().unwrap()).collect()
    }

    fn program(period: u64) -> GrantsProgram {
        GrantsProgram::new(OWNER, period, 1, keys()).unwrap()
    }

    fn owner_at(now: Timestamp) -> CallContext {
        CallContext::new(OWNER, now)
    }

    #[test]
    fn test_construction_validates_keys() {
        let err = GrantsProgram::new(OWNER, 10, 1, vec![vec![0x02u8; 32]]).unwrap_err();
        assert_eq!(err, GrantsError::InvalidPublicKeyLength(32));
    }

    #[test]
    fn test_payout_moves_vault_to_federators() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 10).unwrap();

        let events = p.payout(&owner_at(1_000), &mut ledger).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(p.balance(), 7);
        for f in p.federators() {
            assert_eq!(ledger.balance_of(&f.address), 1);
        }
        assert_eq!(p.last_payment(), 1_000);
        assert_eq!(p.history().len(), 3);
    }

    #[test]
    fn test_payout_is_noop_while_waiting() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 10).unwrap();
        p.payout(&owner_at(1_000), &mut ledger).unwrap();

        let events = p.payout(&owner_at(1_050), &mut ledger).unwrap();
        assert!(events.is_empty());
        assert_eq!(p.balance(), 7);
        assert_eq!(p.last_payment(), 1_000);
    }

    #[test]
    fn test_underfunded_payout_changes_nothing() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 2).unwrap();

        let err = p.payout(&owner_at(1_000), &mut ledger).unwrap_err();
        assert_eq!(err, GrantsError::InsufficientFunds { available: 2, needed: 3 });
        assert_eq!(p.balance(), 2);
        assert_eq!(p.last_payment(), 0);
        assert!(p.is_ready(1_000));
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_rejected_transfer_rolls_back_batch() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 10).unwrap();
        let third = p.federators()[2].address;
        ledger.set_rejecting(third, true);

        let err = p.payout(&owner_at(1_000), &mut ledger).unwrap_err();
        assert!(matches!(err, GrantsError::TransferFailure { to, .. } if to == third));
        for f in p.federators() {
            assert_eq!(ledger.balance_of(&f.address), 0);
            assert_eq!(p.scheduler().paid_at(&f.address), None);
        }
        assert_eq!(p.balance(), 10);
        assert_eq!(p.last_payment(), 0);
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_admin_calls_require_owner() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 5).unwrap();
        let ctx = CallContext::new(STRANGER, 1);
        let unauthorized = GrantsError::Unauthorized { caller: STRANGER };

        assert_eq!(p.update_period_length(&ctx, 5), Err(unauthorized.clone()));
        assert_eq!(p.update_amount_to_pay(&ctx, 5), Err(unauthorized.clone()));
        assert_eq!(p.update_feds_pub_keys(&ctx, keys()), Err(unauthorized.clone()));
        assert_eq!(p.disable(&ctx, STRANGER), Err(unauthorized.clone()));
        assert_eq!(p.enable(&ctx, STRANGER), Err(unauthorized.clone()));
        assert_eq!(p.withdraw_funds(&ctx, STRANGER, &mut ledger), Err(unauthorized));

        assert_eq!(p.period_length(), 100);
        assert_eq!(p.amount_to_pay(), 1);
        assert_eq!(p.balance(), 5);
        assert!(!p.is_banned(&STRANGER));
    }

    #[test]
    fn test_unauthorized_precedes_validation() {
        let mut p = program(100);
        let ctx = CallContext::new(STRANGER, 1);
        assert_eq!(
            p.update_period_length(&ctx, 0),
            Err(GrantsError::Unauthorized { caller: STRANGER })
        );
    }

    #[test]
    fn test_zero_updates_rejected() {
        let mut p = program(100);
        assert!(matches!(
            p.update_period_length(&owner_at(1), 0),
            Err(GrantsError::InvalidConfig(_))
        ));
        assert!(matches!(
            p.update_amount_to_pay(&owner_at(1), 0),
            Err(GrantsError::InvalidConfig(_))
        ));
        assert_eq!(p.period_length(), 100);
        assert_eq!(p.amount_to_pay(), 1);
    }

    #[test]
    fn test_withdraw_rejected_keeps_balance() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 9).unwrap();
        ledger.set_rejecting(STRANGER, true);

        let err = p.withdraw_funds(&owner_at(1), STRANGER, &mut ledger).unwrap_err();
        assert!(matches!(err, GrantsError::TransferFailure { amount: 9, .. }));
        assert_eq!(p.balance(), 9);
    }

    #[test]
    fn test_amount_update_applies_to_next_cycle() {
        let mut p = program(100);
        let mut ledger = MemoryLedger::new();
        p.receive(&owner_at(0), 100).unwrap();
        p.update_amount_to_pay(&owner_at(1), 4).unwrap();
        assert_eq!(p.required_funds(), 12);

        let events = p.payout(&owner_at(1), &mut ledger).unwrap();
        assert!(events
            .iter()
            .all(|e| matches!(e, Event::FederatorPaid { amount: 4, .. })));
        assert_eq!(p.balance(), 88);
    }
}
