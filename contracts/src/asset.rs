//! # Asset Book
//!
//! A fungible balance sheet for one asset: who holds how much, and who may
//! spend whose funds. Vaults use it for the underlying asset (an ERC20-like
//! token or the native coin); the reward token keeps its balances in one
//! too.
//!
//! All state sits behind a single `RwLock`, so a `transfer_from` checks the
//! allowance, the balance, and moves the funds as one step.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fixed_yield_protocol::accrual::{AccountId, Amount};

use crate::custody::CustodyError;

/// Balances, allowances, and supply of one asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Ledger {
    balances: BTreeMap<AccountId, Amount>,
    /// `owner -> (spender -> allowance)`.
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
    total_supply: Amount,
}

impl Ledger {
    fn debit(&mut self, account: &str, amount: Amount) -> Result<(), CustodyError> {
        let balance = self.balances.get(account).copied().unwrap_or(0);
        if balance < amount {
            return Err(CustodyError::InsufficientBalance {
                account: account.to_string(),
                balance,
                requested: amount,
            });
        }
        self.balances.insert(account.to_string(), balance - amount);
        Ok(())
    }

    fn credit(&mut self, account: &str, amount: Amount) -> Result<(), CustodyError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    /// Checks the credit side first so a failed transfer writes nothing.
    fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> Result<(), CustodyError> {
        if from != to {
            let to_balance = self.balances.get(to).copied().unwrap_or(0);
            to_balance.checked_add(amount).ok_or(CustodyError::Overflow)?;
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }
}

/// Ledger of a single fungible asset.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetBook {
    /// Ticker symbol (e.g., "mUSD", "ETH").
    symbol: String,
    /// Number of decimal places used for display.
    decimals: u8,
    state: RwLock<Ledger>,
}

impl AssetBook {
    /// Creates an empty book.
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            state: RwLock::new(Ledger::default()),
        }
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Display decimals.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Creates `amount` out of thin air and credits it to `to`.
    ///
    /// This is the faucet: anyone may call it. Gated minting is the reward
    /// token's business.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::Overflow`] if the supply or the balance would
    /// overflow.
    pub fn mint(&self, to: &str, amount: Amount) -> Result<(), CustodyError> {
        let mut state = self.state.write();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(CustodyError::Overflow)?;
        state.credit(to, amount)?;
        state.total_supply = supply;
        debug!(symbol = %self.symbol, to, amount, "minted");
        Ok(())
    }

    /// Balance of `account`, 0 if it has never held the asset.
    pub fn balance_of(&self, account: &str) -> Amount {
        self.state.read().balances.get(account).copied().unwrap_or(0)
    }

    /// Total amount ever minted.
    pub fn total_supply(&self) -> Amount {
        self.state.read().total_supply
    }

    /// Sets how much `spender` may move out of `owner`'s balance.
    /// Overwrites any previous allowance.
    pub fn approve(&self, owner: &str, spender: &str, amount: Amount) {
        self.state
            .write()
            .allowances
            .entry(owner.to_string())
            .or_default()
            .insert(spender.to_string(), amount);
        debug!(symbol = %self.symbol, owner, spender, amount, "approved");
    }

    /// Remaining allowance of `spender` over `owner`'s funds.
    pub fn allowance(&self, owner: &str, spender: &str) -> Amount {
        self.state
            .read()
            .allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`CustodyError::InsufficientBalance`] if `from` is short,
    /// [`CustodyError::Overflow`] if `to` would overflow. Nothing moves on
    /// error.
    pub fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<(), CustodyError> {
        self.state.write().transfer(from, to, amount)?;
        debug!(symbol = %self.symbol, from, to, amount, "transferred");
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    ///
    /// # Errors
    ///
    /// [`CustodyError::InsufficientAllowance`] if `spender` is not approved
    /// for `amount`, otherwise as [`transfer`](Self::transfer).
    pub fn transfer_from(&self, spender: &str, from: &str, to: &str, amount: Amount) -> Result<(), CustodyError> {
        let mut state = self.state.write();
        let allowance = state
            .allowances
            .get(from)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0);
        if allowance < amount {
            return Err(CustodyError::InsufficientAllowance {
                owner: from.to_string(),
                spender: spender.to_string(),
                allowance,
                requested: amount,
            });
        }
        state.transfer(from, to, amount)?;
        state
            .allowances
            .entry(from.to_string())
            .or_default()
            .insert(spender.to_string(), allowance - amount);
        debug!(symbol = %self.symbol, spender, from, to, amount, "transferred from");
        Ok(())
    }
}
