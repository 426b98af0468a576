//! # Custody Collaborators
//!
//! A vault never moves money itself. It asks two collaborators to do it:
//!
//! - an [`AssetCustody`] that pulls the underlying asset from a depositor and
//!   pushes it back on withdrawal, and
//! - a [`RewardMinter`] that issues the reward asset on claim.
//!
//! Both are called from inside the ledger's staged commit, so a failure here
//! aborts the whole operation and the ledger keeps its previous state.
//!
//! Two custody flavors are provided:
//!
//! | Adapter           | Pull semantics                                   |
//! |-------------------|--------------------------------------------------|
//! | [`TokenCustody`]  | ERC20-style: spends an allowance granted to the vault |
//! | [`NativeCustody`] | Native-coin style: value moves with the call     |

use std::sync::Arc;

use thiserror::Error;

use fixed_yield_protocol::accrual::{AccountId, Amount};

use crate::asset::AssetBook;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by custody and minting collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    /// The paying account does not hold enough of the asset.
    #[error("insufficient balance for {account}: has {balance}, needs {requested}")]
    InsufficientBalance {
        /// The account being debited.
        account: AccountId,
        /// Its current balance.
        balance: Amount,
        /// The amount that was requested.
        requested: Amount,
    },

    /// The spender has not been approved for enough of the owner's funds.
    #[error("insufficient allowance: {owner} approved {spender} for {allowance}, needs {requested}")]
    InsufficientAllowance {
        /// The account whose funds would be spent.
        owner: AccountId,
        /// The account trying to spend them.
        spender: AccountId,
        /// Current allowance.
        allowance: Amount,
        /// The amount that was requested.
        requested: Amount,
    },

    /// The caller is not on the reward token's minter allow-list.
    #[error("{0} is not an authorized minter")]
    NotMinter(AccountId),

    /// The caller does not own the token it is trying to administer.
    #[error("{caller} is not the token owner")]
    NotOwner {
        /// The account that attempted the owner-only action.
        caller: AccountId,
    },

    /// A balance or the total supply would overflow.
    #[error("asset balance overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Moves the underlying asset between depositors and a vault.
///
/// Called while the vault holds ledger locks; implementations must not
/// call back into the vault.
pub trait AssetCustody: Send + Sync {
    /// Takes `amount` from `user` into `vault`.
    fn pull(&self, user: &str, vault: &str, amount: Amount) -> Result<(), CustodyError>;

    /// Sends `amount` from `vault` back to `user`.
    fn push(&self, vault: &str, user: &str, amount: Amount) -> Result<(), CustodyError>;

    /// Balance `account` holds of the underlying asset.
    fn balance_of(&self, account: &str) -> Amount;
}

/// Issues the reward asset. Implementations enforce their own minter
/// allow-list and fail with [`CustodyError::NotMinter`] for strangers.
pub trait RewardMinter: Send + Sync {
    /// Mints `amount` to `to` on behalf of `minter`.
    fn mint(&self, minter: &str, to: &str, amount: Amount) -> Result<(), CustodyError>;
}

impl<T: AssetCustody + ?Sized> AssetCustody for Arc<T> {
    fn pull(&self, user: &str, vault: &str, amount: Amount) -> Result<(), CustodyError> {
        (**self).pull(user, vault, amount)
    }

    fn push(&self, vault: &str, user: &str, amount: Amount) -> Result<(), CustodyError> {
        (**self).push(vault, user, amount)
    }

    fn balance_of(&self, account: &str) -> Amount {
        (**self).balance_of(account)
    }
}

impl<T: RewardMinter + ?Sized> RewardMinter for Arc<T> {
    fn mint(&self, minter: &str, to: &str, amount: Amount) -> Result<(), CustodyError> {
        (**self).mint(minter, to, amount)
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// ERC20-style custody: the depositor must first `approve` the vault, and a
/// pull spends that allowance.
#[derive(Debug, Clone)]
pub struct TokenCustody {
    book: Arc<AssetBook>,
}

impl TokenCustody {
    /// Wraps a shared asset book.
    pub fn new(book: Arc<AssetBook>) -> Self {
        Self { book }
    }

    /// The underlying asset book.
    pub fn book(&self) -> &Arc<AssetBook> {
        &self.book
    }
}

impl AssetCustody for TokenCustody {
    fn pull(&self, user: &str, vault: &str, amount: Amount) -> Result<(), CustodyError> {
        self.book.transfer_from(vault, user, vault, amount)
    }

    fn push(&self, vault: &str, user: &str, amount: Amount) -> Result<(), CustodyError> {
        self.book.transfer(vault, user, amount)
    }

    fn balance_of(&self, account: &str) -> Amount {
        self.book.balance_of(account)
    }
}

/// Native-coin custody: the deposit call carries the value, so no allowance
/// is involved.
#[derive(Debug, Clone)]
pub struct NativeCustody {
    book: Arc<AssetBook>,
}

impl NativeCustody {
    /// Wraps a shared balance book for the native coin.
    pub fn new(book: Arc<AssetBook>) -> Self {
        Self { book }
    }

    /// The underlying balance book.
    pub fn book(&self) -> &Arc<AssetBook> {
        &self.book
    }
}

impl AssetCustody for NativeCustody {
    fn pull(&self, user: &str, vault: &str, amount: Amount) -> Result<(), CustodyError> {
        self.book.transfer(user, vault, amount)
    }

    fn push(&self, vault: &str, user: &str, amount: Amount) -> Result<(), CustodyError> {
        self.book.transfer(vault, user, amount)
    }

    fn balance_of(&self, account: &str) -> Amount {
        self.book.balance_of(account)
    }
}
