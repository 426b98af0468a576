//! Error types for the accrual ledger.

use thiserror::Error;

use super::{AccountId, Amount};

/// Errors that can occur during ledger operations.
///
/// Every variant is a rejection: when one is returned, no account state and
/// no rate epoch has been modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A local precondition was violated (zero amount, timestamp moving
    /// backwards, timestamp before the retained rate log).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Withdrawal exceeds the account's principal after settlement.
    #[error("insufficient principal for {account}: available {available}, requested {requested}")]
    InsufficientPrincipal {
        /// The account that tried to withdraw.
        account: AccountId,
        /// Principal held after settlement.
        available: Amount,
        /// The withdrawal amount that was rejected.
        requested: Amount,
    },

    /// Arithmetic overflow in principal, accrued interest, or the interest
    /// formula itself. Realistic balances never get here.
    #[error("arithmetic overflow in ledger")]
    Overflow,

    /// A snapshot failed validation on restore.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::InvalidArgument`].
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }
}
