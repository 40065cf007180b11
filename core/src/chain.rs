//! In-process host for a deployed grants program.
//!
//! Owns the clock, the account ledger and one program instance behind a
//! single lock, so every submitted call executes atomically with respect
//! to every other call.

use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use tracing::{debug, info};

use crate::config::DeploymentParams;
use crate::error::{GrantsError, Result, TransferError};
use crate::ledger::MemoryLedger;
use crate::program::{Event, GrantsProgram};
use crate::types::{Address, Amount, CallContext, Timestamp, ADDRESS_LEN};

struct ChainState {
    now: Timestamp,
    ledger: MemoryLedger,
    program: GrantsProgram,
}

pub struct LocalChain {
    program_address: Address,
    state: Mutex<ChainState>,
}

/// Deterministic program address: low 20 bytes of `keccak256(owner ‖ "grants")`.
fn program_address_for(owner: &Address) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(owner.as_bytes());
    hasher.update(b"grants");
    let hash = hasher.finalize();
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&hash[hash.len() - ADDRESS_LEN..]);
    Address(out)
}

impl LocalChain {
    pub fn deploy<I>(
        owner: Address,
        period_length: u64,
        amount_to_pay: Amount,
        feds_pub_keys: I,
        now: Timestamp,
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let program = GrantsProgram::new(owner, period_length, amount_to_pay, feds_pub_keys)?;
        Ok(Self::with_program(program, now))
    }

    pub fn from_params(params: &DeploymentParams, now: Timestamp) -> Result<Self> {
        Ok(Self::with_program(GrantsProgram::from_params(params)?, now))
    }

    fn with_program(program: GrantsProgram, now: Timestamp) -> Self {
        let program_address = program_address_for(&program.owner());
        info!(program = %program_address, now, "program deployed");
        // value held by the program lives in its vault, never in a ledger account
        let mut ledger = MemoryLedger::new();
        ledger.set_rejecting(program_address, true);
        Self {
            program_address,
            state: Mutex::new(ChainState { now, ledger, program }),
        }
    }

    pub fn program_address(&self) -> Address {
        self.program_address
    }

    // -----------------------------------------------------------------------
    // Clock and accounts
    // -----------------------------------------------------------------------

    pub fn now(&self) -> Timestamp {
        self.state.lock().now
    }

    /// Move the clock forward; returns the new time.
    pub fn advance_time(&self, secs: u64) -> Timestamp {
        let mut state = self.state.lock();
        state.now = state.now.saturating_add(secs);
        debug!(now = state.now, "clock advanced");
        state.now
    }

    fn program_account_rejected(&self, amount: Amount) -> GrantsError {
        GrantsError::TransferFailure {
            to: self.program_address,
            amount,
            reason: TransferError::Rejected,
        }
    }

    /// Mint test balance for `addr`. The program account cannot be minted
    /// to; use [`LocalChain::fund`].
    pub fn credit(&self, addr: &Address, amount: Amount) -> Result<()> {
        if *addr == self.program_address {
            return Err(self.program_account_rejected(amount));
        }
        let mut state = self.state.lock();
        state
            .ledger
            .mint(addr, amount)
            .map_err(|reason| GrantsError::TransferFailure {
                to: *addr,
                amount,
                reason,
            })
    }

    pub fn balance_of(&self, addr: &Address) -> Amount {
        self.state.lock().ledger.balance_of(addr)
    }

    pub fn program_balance(&self) -> Amount {
        self.state.lock().program.balance()
    }

    /// Make `addr` refuse every incoming credit.
    pub fn reject_transfers_to(&self, addr: Address) {
        self.state.lock().ledger.set_rejecting(addr, true);
    }

    /// No-op for the program address, which always refuses credits.
    pub fn accept_transfers_to(&self, addr: Address) {
        if addr == self.program_address {
            return;
        }
        self.state.lock().ledger.set_rejecting(addr, false);
    }

    pub fn rejects_transfers_to(&self, addr: &Address) -> bool {
        self.state.lock().ledger.is_rejecting(addr)
    }

    /// Send `amount` from `from` into the program vault.
    pub fn fund(&self, from: &Address, amount: Amount) -> Result<Amount> {
        if *from == self.program_address {
            return Err(self.program_account_rejected(amount));
        }
        let mut state = self.state.lock();
        state
            .ledger
            .debit(from, amount)
            .map_err(|reason| GrantsError::TransferFailure {
                to: self.program_address,
                amount,
                reason,
            })?;
        let ctx = CallContext::new(*from, state.now);
        match state.program.receive(&ctx, amount) {
            Ok(balance) => Ok(balance),
            Err(e) => {
                // vault full; hand the value back
                state.ledger.mint(from, amount).ok();
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Run a read against the program under the lock.
    pub fn view<R>(&self, f: impl FnOnce(&GrantsProgram) -> R) -> R {
        f(&self.state.lock().program)
    }

    pub fn submit_payout(&self, caller: Address) -> Result<Vec<Event>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let ctx = CallContext::new(caller, state.now);
        state.program.payout(&ctx, &mut state.ledger)
    }

    /// Run `cycles` payouts as `caller`, advancing the clock by the current
    /// period after each one. Returns the events of every cycle in order and
    /// stops at the first failing cycle.
    pub fn run_payout_cycles(&self, caller: Address, cycles: u32) -> Result<Vec<Vec<Event>>> {
        let mut rounds = Vec::with_capacity(cycles as usize);
        for cycle in 1..=cycles {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let ctx = CallContext::new(caller, state.now);
            let events = state.program.payout(&ctx, &mut state.ledger)?;
            debug!(cycle, paid = events.len(), "payout cycle ran");
            let period = state.program.period_length();
            state.now = state.now.saturating_add(period);
            rounds.push(events);
        }
        Ok(rounds)
    }

    /// `to` may not be the program itself; the credit is refused and the
    /// vault keeps its balance.
    pub fn submit_withdraw_funds(&self, caller: Address, to: Address) -> Result<Vec<Event>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let ctx = CallContext::new(caller, state.now);
        state.program.withdraw_funds(&ctx, to, &mut state.ledger)
    }

    pub fn submit_disable(&self, caller: Address, member: Address) -> Result<Vec<Event>> {
        self.with_ctx(caller, |p, ctx| p.disable(ctx, member))
    }

    pub fn submit_enable(&self, caller: Address, member: Address) -> Result<Vec<Event>> {
        self.with_ctx(caller, |p, ctx| p.enable(ctx, member))
    }

    pub fn submit_update_period_length(&self, caller: Address, period_length: u64) -> Result<Vec<Event>> {
        self.with_ctx(caller, |p, ctx| p.update_period_length(ctx, period_length))
    }

    pub fn submit_update_amount_to_pay(&self, caller: Address, amount: Amount) -> Result<Vec<Event>> {
        self.with_ctx(caller, |p, ctx| p.update_amount_to_pay(ctx, amount))
    }

    pub fn submit_update_feds_pub_keys<I>(&self, caller: Address, keys: I) -> Result<Vec<Event>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.with_ctx(caller, |p, ctx| p.update_feds_pub_keys(ctx, keys))
    }

    fn with_ctx<R>(&self, caller: Address, f: impl FnOnce(&mut GrantsProgram, &CallContext) -> R) -> R {
        let mut state = self.state.lock();
        let ctx = CallContext::new(caller, state.now);
        f(&mut state.program, &ctx)
    }
}
