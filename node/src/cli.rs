//! # CLI Interface
//!
//! Defines the command-line argument structure for `fixed-yield` using
//! `clap` derive. Every subcommand works against one JSON state file that
//! holds the reward token, the underlying asset, and the vault.
//!
//! Amounts are decimal token units (`"200"`, `"0.5"`), converted with the
//! asset's decimals before they reach the ledger.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use fixed_yield_contracts::vault::VaultKind;
use fixed_yield_protocol::config::{DEFAULT_ANNUAL_RATE_BPS, DEFAULT_ASSET_DECIMALS};

/// Fixed-rate yield vault.
///
/// Deposit an asset, earn a reward token at a fixed annual rate the admin
/// can change, claim whenever you like.
#[derive(Parser, Debug)]
#[command(
    name = "fixed-yield",
    about = "Fixed-rate yield vault",
    version,
    propagate_version = true
)]
pub struct FixedYieldCli {
    /// Path to the vault state file.
    #[arg(long, short = 's', global = true, env = "FIXED_YIELD_STATE", default_value = "fixed-yield.json")]
    pub state: PathBuf,

    /// Log output format.
    #[arg(long, global = true, env = "FIXED_YIELD_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, global = true, env = "FIXED_YIELD_LOG", default_value = "fixed_yield=warn")]
    pub log_level: String,

    #[command(flatten)]
    pub clock: ClockArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log format selector.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable.
    Pretty,
    /// JSON lines.
    Json,
}

/// Controls the timestamp operations run at.
#[derive(Args, Debug, Clone, Default)]
pub struct ClockArgs {
    /// Run at this Unix time (seconds) instead of the wall clock.
    #[arg(long, global = true, env = "FIXED_YIELD_AT")]
    pub at: Option<u64>,

    /// Move the vault clock forward by this many days before running.
    /// The jump is saved and applies to every later command. Ignored with
    /// `--at`.
    #[arg(long, global = true, default_value_t = 0)]
    pub advance_days: u64,
}

/// Top-level subcommands for the `fixed-yield` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a reward token, an underlying asset, and a vault into a new
    /// state file.
    Init(InitArgs),
    /// Mint underlying asset to a user (test faucet).
    Faucet(AmountArgs),
    /// Allow the vault to pull a user's underlying (ERC4626 vaults).
    Approve(AmountArgs),
    /// Deposit underlying into the vault.
    Deposit(AmountArgs),
    /// Withdraw part of the principal.
    Withdraw(AmountArgs),
    /// Withdraw all of the principal.
    Redeem(UserArgs),
    /// Mint all accrued rewards to the user.
    Claim(UserArgs),
    /// Change the annual rate (admin only).
    SetRate(SetRateArgs),
    /// Grant or revoke the reward token's minter role (token owner only).
    SetMinter(SetMinterArgs),
    /// Show a user's principal and pending reward.
    Pending(UserArgs),
    /// Show vault totals.
    Status(StatusArgs),
    /// Compute simple interest without touching any state.
    Quote(QuoteArgs),
    /// Print version information and exit.
    Version,
}

/// Underlying asset flavor, as typed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    /// ERC20 underlying with 1:1 shares.
    Erc4626,
    /// Native coin.
    Native,
}

impl From<KindArg> for VaultKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Erc4626 => VaultKind::Erc4626,
            KindArg::Native => VaultKind::Native,
        }
    }
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Vault flavor.
    #[arg(long, value_enum, default_value_t = KindArg::Erc4626)]
    pub kind: KindArg,

    /// Account that owns the reward token and administers the vault.
    #[arg(long, env = "FIXED_YIELD_ADMIN", default_value = "deployer")]
    pub admin: String,

    /// Initial annual rate in basis points (500 = 5%).
    #[arg(long, default_value_t = DEFAULT_ANNUAL_RATE_BPS)]
    pub rate_bps: u32,

    /// Decimals of the underlying asset.
    #[arg(long, default_value_t = DEFAULT_ASSET_DECIMALS)]
    pub decimals: u8,

    /// Ticker of the underlying asset ("mUSD" or "ETH" by default).
    #[arg(long)]
    pub symbol: Option<String>,

    /// Do not authorize the vault as reward minter. Claims will fail until
    /// `set-minter` is run.
    #[arg(long)]
    pub no_minter: bool,

    /// Overwrite an existing state file.
    #[arg(long)]
    pub force: bool,
}

/// Selects the acting user.
#[derive(Args, Debug)]
pub struct UserArgs {
    /// Account to act as.
    #[arg(long, short = 'u', env = "FIXED_YIELD_USER", default_value = "user")]
    pub user: String,
}

/// A user plus a decimal amount.
#[derive(Args, Debug)]
pub struct AmountArgs {
    #[command(flatten)]
    pub user: UserArgs,

    /// Amount in token units (e.g. "200" or "0.5").
    pub amount: String,
}

/// Arguments for the `set-rate` subcommand.
#[derive(Args, Debug)]
pub struct SetRateArgs {
    /// New annual rate in basis points.
    pub rate_bps: u32,

    /// Account making the change. Defaults to the vault admin.
    #[arg(long)]
    pub caller: Option<String>,
}

/// Arguments for the `set-minter` subcommand.
#[derive(Args, Debug)]
pub struct SetMinterArgs {
    /// Account to grant or revoke. Defaults to the vault itself.
    #[arg(long)]
    pub minter: Option<String>,

    /// Revoke instead of grant.
    #[arg(long)]
    pub revoke: bool,

    /// Account making the change. Defaults to the token owner.
    #[arg(long)]
    pub caller: Option<String>,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print Prometheus text exposition instead of a summary.
    #[arg(long)]
    pub metrics: bool,
}

/// Arguments for the `quote` subcommand.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Principal in token units.
    pub principal: String,

    /// Annual rate in basis points.
    #[arg(long, default_value_t = DEFAULT_ANNUAL_RATE_BPS)]
    pub rate_bps: u32,

    /// Holding period in days.
    #[arg(long, default_value_t = 365)]
    pub days: u64,

    /// Decimals of the asset.
    #[arg(long, default_value_t = DEFAULT_ASSET_DECIMALS)]
    pub decimals: u8,
}
