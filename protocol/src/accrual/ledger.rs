//! # Accrual Ledger
//!
//! The keyed store that owns every [`AccountState`] of a vault together with
//! its [`RateSchedule`].
//!
//! ## Locking
//!
//! - Accounts live in a `DashMap`. An operation holds its account's shard
//!   lock from settlement to commit, so operations on the same account are
//!   linearized while unrelated accounts proceed in parallel.
//! - The schedule sits behind a `parking_lot::RwLock`. An operation holds the
//!   read lock from settlement to commit and rate changes take the write
//!   lock, so a rate change never lands between a settlement and its commit.
//! - Lock order is always account shard, then schedule. [`set_rate`] never
//!   takes an account lock, which rules out deadlock. [`prune_epochs`] needs
//!   both at once and therefore takes `&mut self`.
//!
//! The closure passed to [`transact`] runs with both locks held. While it
//! runs, other accounts in the same shard wait, and so does [`set_rate`].
//! It must not call back into the ledger: re-entering the same shard
//! deadlocks, and a second read of the schedule can block behind a queued
//! rate change.
//!
//! ## Staged commits
//!
//! [`transact`] settles a *copy* of the account, hands it to a closure, and
//! writes it back only if the closure succeeds. The vault layer runs its
//! asset transfers and reward mints inside that closure, which makes
//! "ledger change + external call" all-or-nothing. The high-water mark only
//! moves when something is written.
//!
//! [`set_rate`]: AccrualLedger::set_rate
//! [`prune_epochs`]: AccrualLedger::prune_epochs
//! [`transact`]: AccrualLedger::transact

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::account::AccountState;
use super::schedule::{RateEpoch, RateSchedule};
use super::{AccountId, Amount, LedgerError, Timestamp};

/// Schedule plus the latest timestamp any committed operation has used.
///
/// Commits raise `high_water` while holding the read lock; rate changes
/// check it under the write lock. A rate change therefore either sees a
/// commit's timestamp or happens entirely before that operation read the
/// schedule.
#[derive(Debug)]
struct RateState {
    schedule: RateSchedule,
    high_water: AtomicU64,
}

/// Serializable image of a ledger, with accounts in deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Retained rate epochs, oldest first.
    pub epochs: Vec<RateEpoch>,
    /// Latest timestamp the ledger has settled at.
    pub high_water: Timestamp,
    /// Every account, keyed by identifier.
    pub accounts: BTreeMap<AccountId, AccountState>,
}

/// Fixed-rate accrual ledger for a single vault.
#[derive(Debug)]
pub struct AccrualLedger {
    accounts: DashMap<AccountId, AccountState>,
    rates: RwLock<RateState>,
}

impl AccrualLedger {
    /// Creates an empty ledger with its first rate epoch at `genesis`.
    pub fn new(genesis: Timestamp, annual_rate_bps: u32) -> Self {
        Self {
            accounts: DashMap::new(),
            rates: RwLock::new(RateState {
                schedule: RateSchedule::new(genesis, annual_rate_bps),
                high_water: AtomicU64::new(genesis),
            }),
        }
    }

    /// Restores a ledger from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSnapshot`] if the epoch log is empty or
    /// unordered, or an account checkpoint falls outside
    /// `[first epoch start, high_water]`.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let schedule = RateSchedule::from_epochs(snapshot.epochs)?;
        if snapshot.high_water < schedule.latest().start_time {
            return Err(LedgerError::InvalidSnapshot(format!(
                "high-water mark {} precedes latest epoch start {}",
                snapshot.high_water,
                schedule.latest().start_time
            )));
        }
        for (id, acct) in &snapshot.accounts {
            if acct.last_checkpoint < schedule.earliest() || acct.last_checkpoint > snapshot.high_water {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "account {} checkpoint {} outside [{}, {}]",
                    id,
                    acct.last_checkpoint,
                    schedule.earliest(),
                    snapshot.high_water
                )));
            }
        }

        Ok(Self {
            accounts: snapshot.accounts.into_iter().collect(),
            rates: RwLock::new(RateState {
                schedule,
                high_water: AtomicU64::new(snapshot.high_water),
            }),
        })
    }

    /// Captures the full ledger state.
    ///
    /// Not a global atomic cut: accounts are copied one at a time. Take
    /// snapshots while the ledger is quiescent.
    pub fn snapshot(&self) -> LedgerSnapshot {
        // Accounts first: holding the schedule lock while waiting on a shard
        // would invert the lock order.
        let accounts: BTreeMap<AccountId, AccountState> = self
            .accounts
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let rates = self.rates.read();
        LedgerSnapshot {
            epochs: rates.schedule.epochs().to_vec(),
            high_water: rates.high_water.load(Ordering::Acquire),
            accounts,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Settles `account` at `now` on a staged copy, runs `op` on it, and
    /// commits the copy only if `op` succeeds.
    ///
    /// A missing account is staged as [`AccountState::new`]`(now)`; it is
    /// inserted on commit only if it ends up holding principal or
    /// unclaimed interest, so probing a stranger never creates an entry.
    /// The high-water mark is raised only when the account is written.
    ///
    /// # Errors
    ///
    /// Settlement failures are converted into `E`; whatever `op` returns is
    /// passed through. In both cases nothing is written.
    pub fn transact<T, E, F>(&self, account: &str, now: Timestamp, op: F) -> Result<T, E>
    where
        E: From<LedgerError>,
        F: FnOnce(&mut AccountState) -> Result<T, E>,
    {
        match self.accounts.entry(account.to_string()) {
            Entry::Occupied(mut slot) => {
                let rates = self.rates.read();
                let mut staged = slot.get().clone();
                let earned = settle_staged(&rates.schedule, &mut staged, now)?;
                let out = op(&mut staged)?;
                *slot.get_mut() = staged;
                rates.high_water.fetch_max(now, Ordering::AcqRel);
                drop(rates);
                if earned > 0 {
                    debug!(account, now, earned, "settled");
                }
                Ok(out)
            }
            Entry::Vacant(slot) => {
                let rates = self.rates.read();
                let mut staged = AccountState::new(now);
                settle_staged(&rates.schedule, &mut staged, now)?;
                let out = op(&mut staged)?;
                if staged.principal > 0 || staged.accrued_unclaimed > 0 {
                    slot.insert(staged);
                    rates.high_water.fetch_max(now, Ordering::AcqRel);
                    debug!(account, now, "account created");
                }
                Ok(out)
            }
        }
    }

    /// Realizes all interest on `account` up to `now`.
    pub fn settle(&self, account: &str, now: Timestamp) -> Result<(), LedgerError> {
        self.transact(account, now, |_| Ok::<_, LedgerError>(()))
    }

    /// Settles, then adds `amount` to the account's principal, creating the
    /// account on first deposit.
    pub fn deposit(&self, account: &str, amount: Amount, now: Timestamp) -> Result<(), LedgerError> {
        self.transact(account, now, |acct| acct.credit_principal(amount))?;
        info!(account, amount, now, "deposit recorded");
        Ok(())
    }

    /// Settles, then removes `amount` from the account's principal.
    pub fn withdraw(&self, account: &str, amount: Amount, now: Timestamp) -> Result<(), LedgerError> {
        self.transact(account, now, |acct| acct.debit_principal(account, amount))?;
        info!(account, amount, now, "withdrawal recorded");
        Ok(())
    }

    /// Settles, then zeroes and returns the account's unclaimed interest.
    pub fn claim(&self, account: &str, now: Timestamp) -> Result<Amount, LedgerError> {
        let amount = self.transact(account, now, |acct| Ok::<_, LedgerError>(acct.take_accrued()))?;
        info!(account, amount, now, "claim recorded");
        Ok(amount)
    }

    /// Starts a new rate epoch at `now`. Touches no account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `now` is earlier than any
    /// timestamp the ledger has already committed at, which would make the
    /// change retroactive.
    pub fn set_rate(&self, now: Timestamp, annual_rate_bps: u32) -> Result<(), LedgerError> {
        let mut rates = self.rates.write();
        let settled = *rates.high_water.get_mut();
        if now < settled {
            return Err(LedgerError::invalid(format!(
                "rate change at {} is earlier than settled time {}",
                now, settled
            )));
        }
        let previous = rates.schedule.current_rate_bps();
        rates.schedule.append(now, annual_rate_bps)?;
        *rates.high_water.get_mut() = now;
        info!(now, previous, annual_rate_bps, "annual rate changed");
        Ok(())
    }

    /// Drops rate epochs no account can still need: those that ended at or
    /// before the earliest checkpoint across all accounts. Returns how many
    /// were removed.
    ///
    /// With no accounts the cutoff is the high-water mark. Takes `&mut self`
    /// so no account can be created mid-scan with a checkpoint below the
    /// cutoff.
    pub fn prune_epochs(&mut self) -> usize {
        let min_checkpoint = self.accounts.iter().map(|e| e.value().last_checkpoint).min();
        let rates = self.rates.get_mut();
        let settled = *rates.high_water.get_mut();
        let cutoff = min_checkpoint.unwrap_or(settled).min(settled);
        let removed = rates.schedule.prune_before(cutoff);
        if removed > 0 {
            debug!(cutoff, removed, "pruned rate epochs");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Reward `account` would receive from a claim at `now`. Read-only.
    ///
    /// Unknown accounts report 0.
    pub fn pending_reward(&self, account: &str, now: Timestamp) -> Result<Amount, LedgerError> {
        let Some(acct) = self.accounts.get(account) else {
            return Ok(0);
        };
        let rates = self.rates.read();
        acct.pending_reward(&rates.schedule, now)
    }

    /// Copy of an account's state, if it exists.
    pub fn account(&self, account: &str) -> Option<AccountState> {
        self.accounts.get(account).map(|a| a.clone())
    }

    /// Principal held by `account` (0 if unknown).
    pub fn principal_of(&self, account: &str) -> Amount {
        self.accounts.get(account).map_or(0, |a| a.principal)
    }

    /// Sum of all principals.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the sum exceeds `u128::MAX`.
    pub fn total_principal(&self) -> Result<Amount, LedgerError> {
        self.accounts.iter().try_fold(0u128, |acc, e| {
            acc.checked_add(e.value().principal).ok_or(LedgerError::Overflow)
        })
    }

    /// Sum of all realized-but-unclaimed interest (not including unsettled
    /// time).
    pub fn total_unclaimed(&self) -> Result<Amount, LedgerError> {
        self.accounts.iter().try_fold(0u128, |acc, e| {
            acc.checked_add(e.value().accrued_unclaimed).ok_or(LedgerError::Overflow)
        })
    }

    /// Number of accounts that have ever deposited.
    pub fn accounts_len(&self) -> usize {
        self.accounts.len()
    }

    /// Rate currently in force.
    pub fn current_rate_bps(&self) -> u32 {
        self.rates.read().schedule.current_rate_bps()
    }

    /// Retained rate epochs, oldest first.
    pub fn epochs(&self) -> Vec<RateEpoch> {
        self.rates.read().schedule.epochs().to_vec()
    }

    /// Latest timestamp the ledger has committed an operation or changed rate at.
    pub fn high_water(&self) -> Timestamp {
        self.rates.read().high_water.load(Ordering::Acquire)
    }
}

/// Settles `staged` against `schedule`, rejecting timestamps that predate
/// the retained rate log.
fn settle_staged(schedule: &RateSchedule, staged: &mut AccountState, now: Timestamp) -> Result<Amount, LedgerError> {
    if now < schedule.earliest() {
        return Err(LedgerError::invalid(format!(
            "timestamp {} predates the rate log (starts {})",
            now,
            schedule.earliest()
        )));
    }
    staged.settle(schedule, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::interest::interest;
    use crate::config::days;

    const E: Amount = 1_000_000_000_000_000_000;

    #[test]
    fn deposit_creates_account() {
        let ledger = AccrualLedger::new(0, 500);
        assert!(ledger.account("alice").is_none());
        ledger.deposit("alice", 10 * E, days(1)).unwrap();
        let acct = ledger.account("alice").unwrap();
        assert_eq!(acct.principal, 10 * E);
        assert_eq!(acct.last_checkpoint, days(1));
        assert_eq!(ledger.accounts_len(), 1);
    }

    #[test]
    fn probing_unknown_account_creates_nothing() {
        let ledger = AccrualLedger::new(0, 500);
        assert_eq!(ledger.claim("ghost", days(1)).unwrap(), 0);
        ledger.settle("ghost", days(2)).unwrap();
        assert_eq!(ledger.pending_reward("ghost", days(3)).unwrap(), 0);
        assert!(matches!(
            ledger.withdraw("ghost", 1, days(3)),
            Err(LedgerError::InsufficientPrincipal { available: 0, .. })
        ));
        assert_eq!(ledger.accounts_len(), 0);
    }

    #[test]
    fn failed_op_commits_nothing() {
        let ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", E, 0).unwrap();
        let before = ledger.account("alice").unwrap();

        let res: Result<(), LedgerError> = ledger.transact("alice", days(9), |acct| {
            acct.credit_principal(E)?;
            Err(LedgerError::invalid("collaborator said no"))
        });
        assert!(res.is_err());
        assert_eq!(ledger.account("alice").unwrap(), before);
    }

    #[test]
    fn set_rate_cannot_be_retroactive() {
        let ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", E, days(10)).unwrap();
        assert!(matches!(
            ledger.set_rate(days(5), 900),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(ledger.current_rate_bps(), 500);
        ledger.set_rate(days(10), 900).unwrap();
        assert_eq!(ledger.current_rate_bps(), 900);
    }

    #[test]
    fn rejected_and_empty_ops_leave_high_water() {
        let ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", E, 0).unwrap();

        assert!(matches!(
            ledger.deposit("mallory", 0, days(10_000)),
            Err(LedgerError::InvalidArgument(_))
        ));
        let pulled: Result<(), LedgerError> = ledger.transact("mallory", days(15_000), |acct| {
            acct.credit_principal(E)?;
            Err(LedgerError::invalid("pull refused"))
        });
        assert!(pulled.is_err());
        assert_eq!(ledger.claim("ghost", days(20_000)).unwrap(), 0);
        ledger.settle("ghost", days(20_000)).unwrap();
        assert!(ledger.withdraw("alice", 2 * E, days(20_000)).is_err());

        assert_eq!(ledger.high_water(), 0);
        assert_eq!(ledger.accounts_len(), 1);
        ledger.set_rate(days(30), 900).unwrap();
        assert_eq!(ledger.current_rate_bps(), 900);
        assert_eq!(
            ledger.pending_reward("alice", days(60)).unwrap(),
            interest(E, 500, days(30)).unwrap() + interest(E, 900, days(30)).unwrap()
        );
    }

    #[test]
    fn operations_before_genesis_rejected() {
        let ledger = AccrualLedger::new(days(1), 500);
        assert!(matches!(
            ledger.deposit("alice", E, 0),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(ledger.accounts_len(), 0);
    }

    #[test]
    fn prune_keeps_what_accounts_need() {
        let mut ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", E, days(1)).unwrap();
        ledger.set_rate(days(2), 600).unwrap();
        ledger.set_rate(days(3), 700).unwrap();
        ledger.deposit("bob", E, days(4)).unwrap();

        // Alice still sits in epoch 0.
        assert_eq!(ledger.prune_epochs(), 0);

        ledger.settle("alice", days(5)).unwrap();
        let before = ledger.pending_reward("bob", days(8)).unwrap();
        // Earliest checkpoint is now bob's (day 4), inside the 700 bps epoch.
        assert_eq!(ledger.prune_epochs(), 2);
        assert_eq!(ledger.epochs().len(), 1);
        assert_eq!(ledger.pending_reward("bob", days(8)).unwrap(), before);
        assert_eq!(before, interest(E, 700, days(4)).unwrap());
    }

    #[test]
    fn snapshot_round_trip() {
        let ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", 3 * E, days(1)).unwrap();
        ledger.set_rate(days(7), 250).unwrap();
        ledger.deposit("bob", E, days(8)).unwrap();

        let snap = ledger.snapshot();
        let restored = AccrualLedger::from_snapshot(snap.clone()).unwrap();
        assert_eq!(restored.snapshot(), snap);
        assert_eq!(
            restored.pending_reward("alice", days(30)).unwrap(),
            ledger.pending_reward("alice", days(30)).unwrap()
        );
    }

    #[test]
    fn snapshot_with_checkpoint_past_high_water_rejected() {
        let ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", E, days(1)).unwrap();
        let mut snap = ledger.snapshot();
        snap.high_water = 0;
        assert!(matches!(
            AccrualLedger::from_snapshot(snap),
            Err(LedgerError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn totals() {
        let ledger = AccrualLedger::new(0, 500);
        ledger.deposit("alice", 2 * E, 0).unwrap();
        ledger.deposit("bob", 3 * E, 0).unwrap();
        ledger.settle("alice", days(365)).unwrap();
        assert_eq!(ledger.total_principal().unwrap(), 5 * E);
        assert_eq!(ledger.total_unclaimed().unwrap(), interest(2 * E, 500, days(365)).unwrap());
        assert_eq!(ledger.principal_of("bob"), 3 * E);
        assert_eq!(ledger.principal_of("carol"), 0);
    }
}
