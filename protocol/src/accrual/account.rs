//! # Per-Account Accrual State
//!
//! An [`AccountState`] is a checkpoint: the principal a depositor holds, the
//! interest already realized, and the moment up to which that realization is
//! complete. At any time `now`:
//!
//! ```text
//! pending(now) = accrued_unclaimed
//!              + schedule.accrued_between(principal, last_checkpoint, now)
//! ```
//!
//! Every mutation settles first, so a change of principal only ever affects
//! time after it. That is the whole trick: no interval is priced twice, and
//! no interval is priced with a principal that wasn't held during it.
//!
//! These operations are pure with respect to everything but `self`. The
//! concurrent keyed store lives in [`super::ledger`].

use serde::{Deserialize, Serialize};

use super::schedule::RateSchedule;
use super::{Amount, LedgerError, Timestamp};

/// Accrual state for one depositor in one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Interest-bearing balance in base units.
    pub principal: Amount,

    /// Time up to which interest has been folded into `accrued_unclaimed`.
    ///
    /// Only [`settle`](Self::settle) advances it, and it never moves
    /// backwards.
    pub last_checkpoint: Timestamp,

    /// Interest realized but not yet claimed.
    pub accrued_unclaimed: Amount,
}

impl AccountState {
    /// Creates an empty account checkpointed at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            principal: 0,
            last_checkpoint: now,
            accrued_unclaimed: 0,
        }
    }

    /// Rejects timestamps the account cannot be settled at.
    fn check_time(&self, schedule: &RateSchedule, now: Timestamp) -> Result<(), LedgerError> {
        if now < self.last_checkpoint {
            return Err(LedgerError::invalid(format!(
                "timestamp {} precedes last checkpoint {}",
                now, self.last_checkpoint
            )));
        }
        if self.last_checkpoint < schedule.earliest() {
            return Err(LedgerError::invalid(format!(
                "checkpoint {} predates the retained rate log (starts {})",
                self.last_checkpoint,
                schedule.earliest()
            )));
        }
        Ok(())
    }

    /// Interest that [`settle`](Self::settle) would add at `now`, without
    /// mutating anything.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for a timestamp before the last
    /// checkpoint; [`LedgerError::Overflow`] on arithmetic overflow.
    pub fn unsettled(&self, schedule: &RateSchedule, now: Timestamp) -> Result<Amount, LedgerError> {
        self.check_time(schedule, now)?;
        schedule.accrued_between(self.principal, self.last_checkpoint, now)
    }

    /// Total reward owed at `now`: realized plus unsettled.
    ///
    /// Uses the same epoch walk and rounding as [`settle`](Self::settle), so
    /// a claim at the same `now` pays exactly this amount.
    pub fn pending_reward(&self, schedule: &RateSchedule, now: Timestamp) -> Result<Amount, LedgerError> {
        self.unsettled(schedule, now)?
            .checked_add(self.accrued_unclaimed)
            .ok_or(LedgerError::Overflow)
    }

    /// Folds interest over `[last_checkpoint, now)` into `accrued_unclaimed`
    /// and moves the checkpoint to `now`. Returns the amount added.
    ///
    /// Idempotent: a second call with the same `now` adds 0. On error the
    /// account is left untouched.
    pub fn settle(&mut self, schedule: &RateSchedule, now: Timestamp) -> Result<Amount, LedgerError> {
        let earned = self.unsettled(schedule, now)?;
        self.accrued_unclaimed = self
            .accrued_unclaimed
            .checked_add(earned)
            .ok_or(LedgerError::Overflow)?;
        self.last_checkpoint = now;
        Ok(earned)
    }

    /// Settles, then adds `amount` to principal.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `amount` is zero. On any error the
    /// account is left untouched.
    pub fn deposit(&mut self, schedule: &RateSchedule, amount: Amount, now: Timestamp) -> Result<(), LedgerError> {
        let mut next = self.clone();
        next.settle(schedule, now)?;
        next.credit_principal(amount)?;
        *self = next;
        Ok(())
    }

    /// Settles, then removes `amount` from principal.
    ///
    /// Withdrawing everything is fine: realized interest stays put and the
    /// account simply stops accruing until the next deposit.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `amount` is zero;
    /// [`LedgerError::InsufficientPrincipal`] if `amount > principal`. On any
    /// error the account is left untouched.
    pub fn withdraw(
        &mut self,
        account: &str,
        schedule: &RateSchedule,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let mut next = self.clone();
        next.settle(schedule, now)?;
        next.debit_principal(account, amount)?;
        *self = next;
        Ok(())
    }

    /// Settles, then takes everything realized. Returns 0 when nothing is
    /// owed.
    pub fn claim(&mut self, schedule: &RateSchedule, now: Timestamp) -> Result<Amount, LedgerError> {
        self.settle(schedule, now)?;
        Ok(self.take_accrued())
    }

    // -----------------------------------------------------------------------
    // Post-settlement mutations
    // -----------------------------------------------------------------------
    //
    // These assume the account is already settled at the current time. The
    // ledger calls them inside `AccrualLedger::transact`, which settles
    // first.

    /// Adds `amount` to principal.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `amount` is zero,
    /// [`LedgerError::Overflow`] if principal would overflow.
    pub fn credit_principal(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::invalid("deposit amount must be positive"));
        }
        self.principal = self
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Removes `amount` from principal; `account` only labels the error.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `amount` is zero,
    /// [`LedgerError::InsufficientPrincipal`] if it exceeds principal.
    pub fn debit_principal(&mut self, account: &str, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::invalid("withdrawal amount must be positive"));
        }
        if amount > self.principal {
            return Err(LedgerError::InsufficientPrincipal {
                account: account.to_string(),
                available: self.principal,
                requested: amount,
            });
        }
        self.principal -= amount;
        Ok(())
    }

    /// Zeroes and returns realized interest.
    pub fn take_accrued(&mut self) -> Amount {
        std::mem::take(&mut self.accrued_unclaimed)
    }
}
