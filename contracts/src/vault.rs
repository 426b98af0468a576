//! # Fixed-Rate Vault
//!
//! Wraps an [`AccrualLedger`] with the two collaborators that move real
//! value: an [`AssetCustody`] for the underlying asset and a
//! [`RewardMinter`] for the reward asset.
//!
//! ```text
//!   deposit:  settle -> principal += amount -> custody.pull(user -> vault)
//!   withdraw: settle -> principal -= amount -> custody.push(vault -> user)
//!   claim:    settle -> take accrued        -> minter.mint(vault, user)
//! ```
//!
//! Each line runs inside [`AccrualLedger::transact`]: the ledger change is
//! staged, the collaborator is called, and only a successful call commits
//! the stage. A refused transfer or mint leaves the account exactly as it
//! was, settlement included.
//!
//! Collaborators are called with the account's ledger shard locked, so a
//! slow transfer stalls other accounts in that shard, and a collaborator
//! must never call back into the vault.
//!
//! Two flavors exist, differing only in which custody adapter the host
//! wires in:
//!
//! - [`VaultKind::Erc4626`] — an ERC20 underlying with 1:1 shares; deposits
//!   spend an allowance the user granted the vault.
//! - [`VaultKind::Native`] — the native coin; value arrives with the call.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use fixed_yield_protocol::accrual::{AccountId, AccrualLedger, Amount, LedgerError, LedgerSnapshot, Timestamp};
use fixed_yield_protocol::config::{
    DEFAULT_ANNUAL_RATE_BPS, DEFAULT_ASSET_DECIMALS, DEFAULT_UNDERLYING_SYMBOL, NATIVE_SYMBOL,
};

use crate::custody::{AssetCustody, CustodyError, RewardMinter};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
///
/// Whatever the variant, the ledger has not been modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// A local precondition was violated (zero amount, stale timestamp).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Withdrawal exceeds principal after settlement.
    #[error("insufficient principal for {account}: available {available}, requested {requested}")]
    InsufficientPrincipal {
        /// The withdrawing account.
        account: AccountId,
        /// Principal held after settlement.
        available: Amount,
        /// The rejected withdrawal amount.
        requested: Amount,
    },

    /// The caller lacks the capability the action needs: the vault admin
    /// role for rate changes, or a minter slot on the reward token for
    /// claims.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The account that was refused.
        caller: AccountId,
        /// What it tried to do.
        action: &'static str,
    },

    /// The paired asset transfer or reward mint failed.
    #[error("external transfer failed: {0}")]
    ExternalTransferFailed(#[source] CustodyError),

    /// Arithmetic overflow in the ledger.
    #[error("arithmetic overflow")]
    Overflow,
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidArgument(msg) => VaultError::InvalidArgument(msg),
            LedgerError::InsufficientPrincipal {
                account,
                available,
                requested,
            } => VaultError::InsufficientPrincipal {
                account,
                available,
                requested,
            },
            LedgerError::Overflow => VaultError::Overflow,
            LedgerError::InvalidSnapshot(msg) => VaultError::InvalidArgument(format!("invalid snapshot: {msg}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which kind of underlying asset the vault holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultKind {
    /// ERC20 underlying, ERC4626-style 1:1 shares.
    Erc4626,
    /// Native coin.
    Native,
}

impl fmt::Display for VaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultKind::Erc4626 => write!(f, "erc4626"),
            VaultKind::Native => write!(f, "native"),
        }
    }
}

/// Per-vault settings fixed at deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Underlying asset flavor.
    pub kind: VaultKind,
    /// Account allowed to change the rate.
    pub admin: AccountId,
    /// Rate of the first epoch, in basis points.
    pub annual_rate_bps: u32,
    /// Ticker of the underlying asset.
    pub asset_symbol: String,
    /// Decimals of the underlying asset.
    pub asset_decimals: u8,
}

impl VaultConfig {
    /// Default settings for a vault of `kind`: 5% APR, 18 decimals, and
    /// "mUSD" or "ETH" as the underlying.
    pub fn new(kind: VaultKind, admin: impl Into<String>) -> Self {
        let asset_symbol = match kind {
            VaultKind::Erc4626 => DEFAULT_UNDERLYING_SYMBOL,
            VaultKind::Native => NATIVE_SYMBOL,
        };
        Self {
            kind,
            admin: admin.into(),
            annual_rate_bps: DEFAULT_ANNUAL_RATE_BPS,
            asset_symbol: asset_symbol.to_string(),
            asset_decimals: DEFAULT_ASSET_DECIMALS,
        }
    }

    /// Overrides the initial rate.
    pub fn with_rate(mut self, annual_rate_bps: u32) -> Self {
        self.annual_rate_bps = annual_rate_bps;
        self
    }
}

/// Serializable image of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    /// The vault's own account on the asset and reward books.
    pub address: AccountId,
    /// Deployment settings.
    pub config: VaultConfig,
    /// Accrual state.
    pub ledger: LedgerSnapshot,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// A fixed-rate yield vault.
#[derive(Debug)]
pub struct VaultController<C, M> {
    address: AccountId,
    config: VaultConfig,
    ledger: AccrualLedger,
    custody: C,
    minter: M,
}

impl<C: AssetCustody, M: RewardMinter> VaultController<C, M> {
    /// Deploys a new vault whose first rate epoch starts at `genesis`.
    ///
    /// The vault gets a fresh `vault-<uuid>` address. It cannot pay out
    /// rewards until that address is allow-listed on the reward token.
    pub fn new(config: VaultConfig, genesis: Timestamp, custody: C, minter: M) -> Self {
        let address = format!("vault-{}", Uuid::new_v4());
        info!(
            vault = %address,
            kind = %config.kind,
            rate_bps = config.annual_rate_bps,
            genesis,
            "vault deployed"
        );
        Self {
            ledger: AccrualLedger::new(genesis, config.annual_rate_bps),
            address,
            config,
            custody,
            minter,
        }
    }

    /// Rebuilds a vault from a snapshot, reattaching collaborators.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] if the ledger snapshot fails
    /// validation.
    pub fn restore(snapshot: VaultSnapshot, custody: C, minter: M) -> Result<Self, VaultError> {
        Ok(Self {
            ledger: AccrualLedger::from_snapshot(snapshot.ledger)?,
            address: snapshot.address,
            config: snapshot.config,
            custody,
            minter,
        })
    }

    /// Captures the vault's state. Collaborators are not included.
    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            address: self.address.clone(),
            config: self.config.clone(),
            ledger: self.ledger.snapshot(),
        }
    }

    /// The vault's own account.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Deployment settings.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Underlying flavor.
    pub fn kind(&self) -> VaultKind {
        self.config.kind
    }

    /// Read access to the accrual state, for reporting.
    pub fn ledger(&self) -> &AccrualLedger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Depositor operations
    // -----------------------------------------------------------------------

    /// Takes `amount` of the underlying from `user` and credits it as
    /// principal.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] for a zero amount or stale `now`;
    /// [`VaultError::ExternalTransferFailed`] if custody refuses the pull
    /// (no allowance, insufficient balance).
    pub fn deposit(&self, user: &str, amount: Amount, now: Timestamp) -> Result<(), VaultError> {
        let result = self.ledger.transact(user, now, |acct| {
            acct.credit_principal(amount)?;
            self.custody
                .pull(user, &self.address, amount)
                .map_err(VaultError::ExternalTransferFailed)
        });
        self.log_outcome("deposit", user, amount, now, result)
    }

    /// Removes `amount` from `user`'s principal and sends it back.
    ///
    /// # Errors
    ///
    /// [`VaultError::InsufficientPrincipal`] if `amount` exceeds principal;
    /// [`VaultError::ExternalTransferFailed`] if custody refuses the push.
    pub fn withdraw(&self, user: &str, amount: Amount, now: Timestamp) -> Result<(), VaultError> {
        let result = self.ledger.transact(user, now, |acct| {
            acct.debit_principal(user, amount)?;
            self.custody
                .push(&self.address, user, amount)
                .map_err(VaultError::ExternalTransferFailed)
        });
        self.log_outcome("withdraw", user, amount, now, result)
    }

    /// Withdraws all of `user`'s principal. Returns the amount sent.
    ///
    /// Unclaimed interest stays claimable.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] if there is nothing to redeem,
    /// otherwise as [`withdraw`](Self::withdraw).
    pub fn redeem(&self, user: &str, now: Timestamp) -> Result<Amount, VaultError> {
        let result = self.ledger.transact(user, now, |acct| {
            let all = acct.principal;
            if all == 0 {
                return Err(VaultError::InvalidArgument(format!("{user} has nothing to redeem")));
            }
            acct.debit_principal(user, all)?;
            self.custody
                .push(&self.address, user, all)
                .map_err(VaultError::ExternalTransferFailed)?;
            Ok(all)
        });
        match result {
            Ok(amount) => self.log_outcome("redeem", user, amount, now, Ok(amount)),
            Err(e) => self.log_outcome("redeem", user, 0, now, Err(e)),
        }
    }

    /// Pays out everything `user` has earned, minting the reward asset.
    /// Returns the amount minted; 0 (and no mint call) if nothing is owed.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`] if the vault is not an allow-listed
    /// minter; [`VaultError::ExternalTransferFailed`] for any other mint
    /// failure. Either way the interest stays unclaimed.
    pub fn claim(&self, user: &str, now: Timestamp) -> Result<Amount, VaultError> {
        let result = self.ledger.transact(user, now, |acct| {
            let amount = acct.take_accrued();
            if amount > 0 {
                self.minter
                    .mint(&self.address, user, amount)
                    .map_err(|e| match e {
                        CustodyError::NotMinter(_) => VaultError::Unauthorized {
                            caller: self.address.clone(),
                            action: "mint rewards",
                        },
                        other => VaultError::ExternalTransferFailed(other),
                    })?;
            }
            Ok(amount)
        });
        match result {
            Ok(amount) => self.log_outcome("claim", user, amount, now, Ok(amount)),
            Err(e) => self.log_outcome("claim", user, 0, now, Err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Changes the annual rate from `now` on. Admin only.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`] if `caller` is not the admin;
    /// [`VaultError::InvalidArgument`] if `now` is earlier than time the
    /// vault has already settled.
    pub fn set_annual_rate_bps(&self, caller: &str, annual_rate_bps: u32, now: Timestamp) -> Result<(), VaultError> {
        if caller != self.config.admin {
            warn!(vault = %self.address, caller, annual_rate_bps, "rate change refused: not admin");
            return Err(VaultError::Unauthorized {
                caller: caller.to_string(),
                action: "set the annual rate",
            });
        }
        self.ledger.set_rate(now, annual_rate_bps).map_err(|e| {
            warn!(vault = %self.address, annual_rate_bps, now, error = %e, "rate change rejected");
            VaultError::from(e)
        })
    }

    /// Drops rate epochs no account needs any more. Returns how many.
    pub fn prune_epochs(&mut self) -> usize {
        self.ledger.prune_epochs()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Reward `user` would receive from a claim at `now`.
    pub fn pending_reward(&self, user: &str, now: Timestamp) -> Result<Amount, VaultError> {
        Ok(self.ledger.pending_reward(user, now)?)
    }

    /// Underlying assets attributable to `user`. Shares are 1:1 with
    /// assets, so this is the principal.
    pub fn principal_of(&self, user: &str) -> Amount {
        self.ledger.principal_of(user)
    }

    /// Rate currently in force.
    pub fn annual_rate_bps(&self) -> u32 {
        self.ledger.current_rate_bps()
    }

    /// Sum of all principal held by the vault.
    pub fn total_assets(&self) -> Result<Amount, VaultError> {
        Ok(self.ledger.total_principal()?)
    }

    /// Underlying balance the custody reports for the vault's address.
    /// Equals [`total_assets`](Self::total_assets) unless someone sent
    /// funds to the vault outside of `deposit`.
    pub fn custody_balance(&self) -> Amount {
        self.custody.balance_of(&self.address)
    }

    fn log_outcome<T>(
        &self,
        op: &'static str,
        user: &str,
        amount: Amount,
        now: Timestamp,
        result: Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        match &result {
            Ok(_) => info!(vault = %self.address, op, user, amount, now, "vault operation"),
            Err(e) => warn!(vault = %self.address, op, user, amount, now, error = %e, "vault operation failed"),
        }
        result
    }
}
