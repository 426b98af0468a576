//! # Protocol Configuration & Constants
//!
//! Every magic number in the yield ledger lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong.
//!
//! Interest math depends on two of these directly ([`BPS_DENOMINATOR`] and
//! [`SECONDS_PER_YEAR`]). Changing either after accounts have accrued
//! silently rewrites history, so don't.

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Seconds in a day. Leap seconds are a clock problem, not a ledger problem.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Seconds in a (non-leap) year: `365 * 86_400`.
///
/// Interest is quoted annually but accrues per second, so this is the
/// denominator that converts an annual rate into a per-second one.
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// Basis points in 100%. 1 bp = 0.01%, so 500 bps = 5.00%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default annual rate for a freshly deployed vault: 5.00% APR.
pub const DEFAULT_ANNUAL_RATE_BPS: u32 = 500;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Decimal places of the underlying and reward assets unless configured
/// otherwise. 18, same as ether and nearly every ERC20 in the wild.
pub const DEFAULT_ASSET_DECIMALS: u8 = 18;

/// Default reward asset name.
pub const DEFAULT_REWARD_NAME: &str = "RewardToken";

/// Default reward asset ticker.
pub const DEFAULT_REWARD_SYMBOL: &str = "RWD";

/// Default underlying asset ticker for token-backed vaults.
pub const DEFAULT_UNDERLYING_SYMBOL: &str = "mUSD";

/// Ticker used for native-value vaults.
pub const NATIVE_SYMBOL: &str = "ETH";

/// Converts whole days to seconds.
pub const fn days(n: u64) -> u64 {
    n * SECONDS_PER_DAY
}
