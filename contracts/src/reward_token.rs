//! # Reward Token
//!
//! The asset vaults pay interest in. Anyone can hold it, but only accounts
//! on the owner-managed minter allow-list can create it. A vault must be put
//! on that list before any of its depositors can claim.
//!
//! ## Security Model
//!
//! - **Owner**: fixed at creation; the only account that may change the
//!   allow-list.
//! - **Minters**: every `mint` checks the caller against the allow-list and
//!   fails with [`CustodyError::NotMinter`] otherwise. Nothing else about
//!   the caller is trusted.
//! - **Supply tracking**: balances and total supply live in an
//!   [`AssetBook`], so overflow is checked on every mint.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fixed_yield_protocol::accrual::{AccountId, Amount};
use fixed_yield_protocol::config::{DEFAULT_ASSET_DECIMALS, DEFAULT_REWARD_NAME, DEFAULT_REWARD_SYMBOL};

use crate::asset::AssetBook;
use crate::custody::{CustodyError, RewardMinter};

/// Mintable reward token with an owner-managed minter allow-list.
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardToken {
    /// Human-readable name (e.g., "RewardToken").
    name: String,
    /// Account allowed to manage the minter list.
    owner: AccountId,
    /// Accounts currently allowed to mint.
    minters: RwLock<BTreeSet<AccountId>>,
    /// Balances and supply.
    book: AssetBook,
}

impl RewardToken {
    /// Creates a token with no supply and an empty minter list.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            minters: RwLock::new(BTreeSet::new()),
            book: AssetBook::new(symbol, DEFAULT_ASSET_DECIMALS),
        }
    }

    /// Creates the default "RewardToken" / "RWD" token.
    pub fn with_defaults(owner: impl Into<String>) -> Self {
        Self::new(DEFAULT_REWARD_NAME, DEFAULT_REWARD_SYMBOL, owner)
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        self.book.symbol()
    }

    /// Always 18.
    pub fn decimals(&self) -> u8 {
        self.book.decimals()
    }

    /// The owner account.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Adds `minter` to, or removes it from, the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::NotOwner`] if `caller` is not the owner.
    pub fn set_minter(&self, caller: &str, minter: &str, allowed: bool) -> Result<(), CustodyError> {
        if caller != self.owner {
            warn!(caller, minter, "rejected minter change from non-owner");
            return Err(CustodyError::NotOwner {
                caller: caller.to_string(),
            });
        }
        let mut minters = self.minters.write();
        if allowed {
            minters.insert(minter.to_string());
        } else {
            minters.remove(minter);
        }
        info!(minter, allowed, "minter updated");
        Ok(())
    }

    /// Whether `account` may mint.
    pub fn is_minter(&self, account: &str) -> bool {
        self.minters.read().contains(account)
    }

    /// All current minters, sorted.
    pub fn minters(&self) -> Vec<AccountId> {
        self.minters.read().iter().cloned().collect()
    }

    /// Mints `amount` to `to`.
    ///
    /// # Errors
    ///
    /// [`CustodyError::NotMinter`] if `minter` is not allow-listed,
    /// [`CustodyError::Overflow`] if the supply would overflow.
    pub fn mint(&self, minter: &str, to: &str, amount: Amount) -> Result<(), CustodyError> {
        if !self.is_minter(minter) {
            warn!(minter, to, amount, "mint refused: not a minter");
            return Err(CustodyError::NotMinter(minter.to_string()));
        }
        self.book.mint(to, amount)
    }

    /// Reward balance of `account`.
    pub fn balance_of(&self, account: &str) -> Amount {
        self.book.balance_of(account)
    }

    /// Total reward ever minted.
    pub fn total_supply(&self) -> Amount {
        self.book.total_supply()
    }
}

impl RewardMinter for RewardToken {
    fn mint(&self, minter: &str, to: &str, amount: Amount) -> Result<(), CustodyError> {
        RewardToken::mint(self, minter, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let token = RewardToken::with_defaults("deployer");
        assert_eq!(token.name(), "RewardToken");
        assert_eq!(token.symbol(), "RWD");
        assert_eq!(token.decimals(), 18);
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn only_minters_can_mint() {
        let token = RewardToken::with_defaults("deployer");
        assert_eq!(
            token.mint("vault", "alice", 10),
            Err(CustodyError::NotMinter("vault".into()))
        );
        // Not even the owner, until it lists itself.
        assert!(token.mint("deployer", "alice", 10).is_err());

        token.set_minter("deployer", "vault", true).unwrap();
        token.mint("vault", "alice", 10).unwrap();
        assert_eq!(token.balance_of("alice"), 10);
        assert_eq!(token.total_supply(), 10);
    }

    #[test]
    fn only_owner_manages_minters() {
        let token = RewardToken::with_defaults("deployer");
        assert!(matches!(
            token.set_minter("mallory", "mallory", true),
            Err(CustodyError::NotOwner { .. })
        ));
        assert!(!token.is_minter("mallory"));
    }

    #[test]
    fn revoked_minter_is_refused() {
        let token = RewardToken::with_defaults("deployer");
        token.set_minter("deployer", "vault", true).unwrap();
        token.set_minter("deployer", "vault", false).unwrap();
        assert!(!token.is_minter("vault"));
        assert!(token.mint("vault", "alice", 1).is_err());
        assert!(token.minters().is_empty());
    }

    #[test]
    fn serialization_roundtrip() {
        let token = RewardToken::with_defaults("deployer");
        token.set_minter("deployer", "vault", true).unwrap();
        token.mint("vault", "alice", 42).unwrap();

        let json = serde_json::to_string(&token).unwrap();
        let restored: RewardToken = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.owner(), "deployer");
        assert!(restored.is_minter("vault"));
        assert_eq!(restored.balance_of("alice"), 42);
    }
}
