//! # Fixed Yield Contracts
//!
//! The value-moving layer on top of the accrual ledger. These contracts
//! turn ledger entries into balances people actually hold:
//!
//! - **Vault** — takes deposits of an underlying asset, tracks principal
//!   and interest in an [`AccrualLedger`](fixed_yield_protocol::accrual::AccrualLedger),
//!   and pays interest out in the reward asset. ERC4626-style (ERC20
//!   underlying) and native-coin flavors.
//! - **Reward Token** — the interest asset, mintable only by allow-listed
//!   vaults.
//! - **Asset Book** — a fungible balance sheet with allowances, used for
//!   the underlying asset and inside the reward token.
//! - **Custody** — the collaborator traits a vault talks to, plus the
//!   adapters that implement them over an asset book.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow: `checked_add` everywhere,
//!    because wrapping arithmetic and money do not mix.
//! 2. A ledger change and its paired transfer commit together or not at all.
//! 3. Capabilities are checked where they live: the admin on the vault, the
//!    minter list on the token.
//! 4. Every stateful type is serializable (serde) for persistent storage.

pub mod asset;
pub mod custody;
pub mod reward_token;
pub mod vault;
