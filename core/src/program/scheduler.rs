use std::collections::{HashMap, HashSet};

use tracing::info;

use super::registry::MembershipRegistry;
use crate::crypto;
use crate::error::{GrantsError, Result};
use crate::types::{Address, Amount, CompressedPublicKey, Timestamp};

/// Roster entry: the configured key and the address derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Federator {
    pub key: CompressedPublicKey,
    pub address: Address,
}

/// Validate every key through decompression and derive its address.
/// Any bad key fails the whole roster.
pub fn derive_roster<I>(keys: I) -> Result<Vec<Federator>>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    keys.into_iter()
        .map(|raw| -> Result<Federator> {
            let key = CompressedPublicKey::from_slice(raw.as_ref())?;
            let address = crypto::address_from_key(&key)?;
            Ok(Federator { key, address })
        })
        .collect()
}

fn check_period(period_length: u64) -> Result<()> {
    if period_length == 0 {
        return Err(GrantsError::InvalidConfig(
            "period length must be greater than 0".into(),
        ));
    }
    Ok(())
}

fn check_amount(amount: Amount) -> Result<()> {
    if amount == 0 {
        return Err(GrantsError::InvalidConfig(
            "amount to pay must be greater than 0".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plan / checkpoint
// ---------------------------------------------------------------------------

/// Effect set of one payout cycle, computed before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPlan {
    /// Roster order, each address at most once
    pub recipients: Vec<Address>,
    pub amount_each: Amount,
    pub total: Amount,
}

impl PayoutPlan {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Clock state overwritten by [`PayoutScheduler::begin_cycle`].
#[derive(Debug)]
pub(crate) struct ClockCheckpoint {
    last_payment: Timestamp,
    previous: Vec<(Address, Option<Timestamp>)>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Payment cycle state and roster.
///
/// The clock is kept per member address: a member is due when it has never
/// been paid or `now >= paid_at + period_length`. `last_payment` is the
/// timestamp of the most recent successful cycle. The scheduler is READY
/// when at least one non-banned member is due and WAITING otherwise, so a
/// fresh program is always READY regardless of the period length.
#[derive(Debug, Clone)]
pub struct PayoutScheduler {
    period_length: u64,
    amount_to_pay: Amount,
    last_payment: Timestamp,
    paid_at: HashMap<Address, Timestamp>,
    federators: Vec<Federator>,
}

impl PayoutScheduler {
    pub fn new<I>(period_length: u64, amount_to_pay: Amount, keys: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        check_period(period_length)?;
        check_amount(amount_to_pay)?;
        Ok(Self {
            period_length,
            amount_to_pay,
            last_payment: 0,
            paid_at: HashMap::new(),
            federators: derive_roster(keys)?,
        })
    }

    pub fn period_length(&self) -> u64 {
        self.period_length
    }

    pub fn amount_to_pay(&self) -> Amount {
        self.amount_to_pay
    }

    pub fn last_payment(&self) -> Timestamp {
        self.last_payment
    }

    pub fn federators(&self) -> &[Federator] {
        &self.federators
    }

    pub fn federator_count(&self) -> usize {
        self.federators.len()
    }

    pub fn fed_pub_key(&self, index: usize) -> Result<&CompressedPublicKey> {
        self.federators
            .get(index)
            .map(|f| &f.key)
            .ok_or(GrantsError::FederatorIndexOutOfRange {
                index,
                len: self.federators.len(),
            })
    }

    /// Full-roster cost of one cycle, ignoring bans and clocks.
    pub fn required_funds(&self) -> Amount {
        (self.federators.len() as Amount).saturating_mul(self.amount_to_pay)
    }

    /// When `addr` was last paid, if ever.
    pub fn paid_at(&self, addr: &Address) -> Option<Timestamp> {
        self.paid_at.get(addr).copied()
    }

    pub fn is_due(&self, addr: &Address, now: Timestamp) -> bool {
        match self.paid_at.get(addr) {
            None => true,
            Some(last) => now >= last.saturating_add(self.period_length),
        }
    }

    /// Program-wide gate: no cycle has run yet, or a full period has passed
    /// since the last one.
    pub fn cycle_open(&self, now: Timestamp) -> bool {
        self.last_payment == 0 || now >= self.last_payment.saturating_add(self.period_length)
    }

    pub fn is_ready(&self, now: Timestamp, registry: &MembershipRegistry) -> bool {
        self.federators
            .iter()
            .any(|f| !registry.is_banned(&f.address) && self.is_due(&f.address, now))
    }

    /// Earliest time a non-banned member becomes due. `Some(0)` means due
    /// now regardless of the clock; `None` means nobody is eligible.
    pub fn next_payout_at(&self, registry: &MembershipRegistry) -> Option<Timestamp> {
        self.federators
            .iter()
            .filter(|f| !registry.is_banned(&f.address))
            .map(|f| {
                self.paid_at
                    .get(&f.address)
                    .map_or(0, |last| last.saturating_add(self.period_length))
            })
            .min()
    }

    /// Eligible set for a cycle at `now`: roster order, non-banned, due,
    /// duplicates collapsed.
    pub fn plan(&self, now: Timestamp, registry: &MembershipRegistry) -> Result<PayoutPlan> {
        let mut seen = HashSet::new();
        let recipients: Vec<Address> = self
            .federators
            .iter()
            .map(|f| f.address)
            .filter(|addr| !registry.is_banned(addr) && self.is_due(addr, now))
            .filter(|addr| seen.insert(*addr))
            .collect();

        let total = (recipients.len() as Amount)
            .checked_mul(self.amount_to_pay)
            .ok_or(GrantsError::AmountOverflow)?;

        Ok(PayoutPlan {
            recipients,
            amount_each: self.amount_to_pay,
            total,
        })
    }

    /// Advance the clock for every planned recipient. Runs before any
    /// transfer so a re-entrant payout observes WAITING.
    pub(crate) fn begin_cycle(&mut self, now: Timestamp, plan: &PayoutPlan) -> ClockCheckpoint {
        let previous: Vec<(Address, Option<Timestamp>)> = plan
            .recipients
            .iter()
            .map(|addr| (*addr, self.paid_at.insert(*addr, now)))
            .collect();
        let checkpoint = ClockCheckpoint {
            last_payment: self.last_payment,
            previous,
        };
        self.last_payment = now;
        checkpoint
    }

    /// A cycle with nobody eligible still consumes the period: every roster
    /// member is stamped `now` and must wait a full period, even if it is
    /// re-enabled right away. Returns `false` when the gate is closed.
    pub(crate) fn close_empty_cycle(&mut self, now: Timestamp) -> bool {
        if !self.cycle_open(now) {
            return false;
        }
        for f in &self.federators {
            self.paid_at.insert(f.address, now);
        }
        self.last_payment = now;
        true
    }

    pub(crate) fn restore(&mut self, checkpoint: ClockCheckpoint) {
        self.last_payment = checkpoint.last_payment;
        for (addr, prev) in checkpoint.previous.into_iter().rev() {
            match prev {
                Some(ts) => {
                    self.paid_at.insert(addr, ts);
                }
                None => {
                    self.paid_at.remove(&addr);
                }
            }
        }
    }

    // -- Owner-gated updates (gate applied by the program) --

    pub(crate) fn set_period_length(&mut self, period_length: u64) -> Result<()> {
        check_period(period_length)?;
        info!(old = self.period_length, new = period_length, "period length updated");
        self.period_length = period_length;
        Ok(())
    }

    pub(crate) fn set_amount_to_pay(&mut self, amount: Amount) -> Result<()> {
        check_amount(amount)?;
        info!(old = %self.amount_to_pay, new = %amount, "amount to pay updated");
        self.amount_to_pay = amount;
        Ok(())
    }

    /// Replace the whole roster. Validated in full before the swap.
    ///
    /// Members joining after a cycle has run start their clock at
    /// `last_payment`, so they wait for the next cycle. Clocks of members
    /// that left are dropped.
    pub(crate) fn replace_federators<I>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let roster = derive_roster(keys)?;
        let members: HashSet<Address> = roster.iter().map(|f| f.address).collect();
        self.paid_at.retain(|addr, _| members.contains(addr));
        if self.last_payment > 0 {
            for addr in &members {
                self.paid_at.entry(*addr).or_insert(self.last_payment);
            }
        }
        info!(old = self.federators.len(), new = roster.len(), "federator roster replaced");
        self.federators = roster;
        Ok(())
    }
}
