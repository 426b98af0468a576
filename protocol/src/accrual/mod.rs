//! # Accrual Module — Fixed-Rate Yield Ledger
//!
//! Tracks, per depositor, a principal balance and the interest it has earned
//! at an administrator-set annual rate. Interest is realized lazily: nothing
//! happens while time passes, and every touch of an account first *settles*
//! it, pricing the elapsed interval before anything about the account
//! changes.
//!
//! ## Architecture
//!
//! ```text
//! interest.rs  — floor(P * bps * secs / (10_000 * year)) in 256-bit math
//! schedule.rs  — append-only rate epoch log, epoch-split accrual
//! account.rs   — per-account checkpoint: settle, deposit, withdraw, claim
//! ledger.rs    — concurrent keyed store, staged commits, snapshots
//! error.rs     — LedgerError
//! ```
//!
//! ## Design Principles
//!
//! 1. **Integers only.** Amounts are `u128` base units, rates are `u32` basis
//!    points, time is `u64` seconds. The only rounding is the single
//!    truncating division in [`interest::interest`].
//!
//! 2. **Time is injected.** Every operation takes `now` explicitly. The
//!    ledger never reads a clock, which makes it deterministic and testable.
//!
//! 3. **Rate changes are never retroactive.** They append an epoch; accounts
//!    pick it up at their next settlement, pricing each sub-interval at the
//!    rate that was actually in force.
//!
//! 4. **Accounts are independent.** No operation on one account reads or
//!    writes another.

pub mod account;
pub mod error;
pub mod interest;
pub mod ledger;
pub mod schedule;

pub use account::AccountState;
pub use error::LedgerError;
pub use interest::interest;
pub use ledger::{AccrualLedger, LedgerSnapshot};
pub use schedule::{RateEpoch, RateSchedule};

/// Identifier of a depositor (an address, a user name -- opaque to us).
pub type AccountId = String;

/// Monetary amount in the smallest indivisible unit of an asset.
pub type Amount = u128;

/// Unix time in whole seconds.
pub type Timestamp = u64;
