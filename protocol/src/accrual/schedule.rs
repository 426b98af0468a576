//! # Rate Schedule
//!
//! The annual rate is administrator-mutable, but changing it must never
//! reach back into time that has already elapsed. Instead of rescanning
//! every account on each change, the schedule keeps an append-only log of
//! [`RateEpoch`]s. Epoch `i` is in force over `[start_i, start_{i+1})`; the
//! last epoch is open-ended.
//!
//! ```text
//!   epoch 0 (500 bps)     epoch 1 (800 bps)       epoch 2 (300 bps) ...
//! |---------------------|-----------------------|-------------------->
//! t0                    t1                      t2
//!            [----- account interval ------)
//!            from                          to
//! ```
//!
//! An account settling over `[from, to)` pays each overlapped epoch at that
//! epoch's own rate. Epochs are found by binary search, so the cost of a
//! settlement is logarithmic in the log length plus linear in the number of
//! epochs the interval actually crosses.

use serde::{Deserialize, Serialize};

use super::interest::interest;
use super::{Amount, LedgerError, Timestamp};

/// A time-bounded interval during which a single annual rate applied.
///
/// Epochs are created by the administrator and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEpoch {
    /// First second (inclusive) at which this rate is in force.
    pub start_time: Timestamp,
    /// Annual rate in basis points.
    pub annual_rate_bps: u32,
}

/// Chronologically ordered, append-only log of rate epochs.
///
/// Invariant: never empty, and `start_time` is non-decreasing. Two epochs
/// may share a start time (a rate set twice in the same second); the earlier
/// one then spans zero seconds and contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSchedule {
    epochs: Vec<RateEpoch>,
}

impl RateSchedule {
    /// Creates a schedule whose first epoch starts at `genesis`.
    pub fn new(genesis: Timestamp, annual_rate_bps: u32) -> Self {
        Self {
            epochs: vec![RateEpoch {
                start_time: genesis,
                annual_rate_bps,
            }],
        }
    }

    /// Rebuilds a schedule from a stored epoch list.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSnapshot`] if the list is empty or out
    /// of order.
    pub fn from_epochs(epochs: Vec<RateEpoch>) -> Result<Self, LedgerError> {
        if epochs.is_empty() {
            return Err(LedgerError::InvalidSnapshot(
                "rate schedule has no epochs".into(),
            ));
        }
        if epochs.windows(2).any(|w| w[1].start_time < w[0].start_time) {
            return Err(LedgerError::InvalidSnapshot(
                "rate epochs are not in chronological order".into(),
            ));
        }
        Ok(Self { epochs })
    }

    /// All retained epochs, oldest first.
    pub fn epochs(&self) -> &[RateEpoch] {
        &self.epochs
    }

    /// Start of the oldest retained epoch. Nothing before this can be priced.
    pub fn earliest(&self) -> Timestamp {
        self.epochs[0].start_time
    }

    /// The most recently appended epoch.
    pub fn latest(&self) -> RateEpoch {
        self.epochs[self.epochs.len() - 1]
    }

    /// The rate currently in force (that of the latest epoch).
    pub fn current_rate_bps(&self) -> u32 {
        self.latest().annual_rate_bps
    }

    /// Number of retained epochs.
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// Always `false`; a schedule holds at least one epoch.
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Appends a new epoch starting at `start_time`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `start_time` precedes the
    /// latest epoch -- the log only grows forward in time.
    pub fn append(&mut self, start_time: Timestamp, annual_rate_bps: u32) -> Result<(), LedgerError> {
        let latest = self.latest();
        if start_time < latest.start_time {
            return Err(LedgerError::invalid(format!(
                "rate change at {} precedes current epoch start {}",
                start_time, latest.start_time
            )));
        }
        self.epochs.push(RateEpoch {
            start_time,
            annual_rate_bps,
        });
        Ok(())
    }

    /// Interest earned by `principal` over `[from, to)`, summed epoch by
    /// epoch, each sub-interval truncated on its own.
    ///
    /// Returns 0 for an empty interval or zero principal. Time before the
    /// earliest retained epoch earns nothing; callers reject such timestamps
    /// before getting here.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the sum exceeds `u128::MAX`.
    pub fn accrued_between(
        &self,
        principal: Amount,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Amount, LedgerError> {
        if principal == 0 || to <= from {
            return Ok(0);
        }

        // Index of the epoch in force at `from`: the last one starting at or
        // before it.
        let first = self
            .epochs
            .partition_point(|e| e.start_time <= from)
            .saturating_sub(1);

        let mut total: Amount = 0;
        for (i, epoch) in self.epochs.iter().enumerate().skip(first) {
            if epoch.start_time >= to {
                break;
            }
            let start = epoch.start_time.max(from);
            let end = match self.epochs.get(i + 1) {
                Some(next) => next.start_time.min(to),
                None => to,
            };
            if end <= start {
                continue;
            }
            let piece = interest(principal, epoch.annual_rate_bps, end - start)?;
            total = total.checked_add(piece).ok_or(LedgerError::Overflow)?;
        }
        Ok(total)
    }

    /// Drops epochs that ended at or before `cutoff`, keeping the epoch in
    /// force at `cutoff`. Returns how many were removed.
    pub fn prune_before(&mut self, cutoff: Timestamp) -> usize {
        let in_force = self
            .epochs
            .partition_point(|e| e.start_time <= cutoff)
            .saturating_sub(1);
        if in_force == 0 {
            return 0;
        }
        self.epochs.drain(..in_force);
        in_force
    }
}
