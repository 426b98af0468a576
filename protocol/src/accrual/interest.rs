//! # Linear Interest
//!
//! ```text
//! interest = floor(principal * rate_bps * elapsed / (10_000 * SECONDS_PER_YEAR))
//! ```
//!
//! The numerator is formed in a 256-bit intermediate so a 128-bit principal
//! can be multiplied by a 32-bit rate and a 64-bit duration without
//! overflowing before the single division. Division happens exactly once and
//! truncates. That makes the function sub-additive in `elapsed`: splitting an
//! interval into pieces can lose at most one base unit per piece, and can
//! never gain anything.

use primitive_types::U256;

use super::{Amount, LedgerError};
use crate::config::{BPS_DENOMINATOR, SECONDS_PER_YEAR};

/// `BPS_DENOMINATOR * SECONDS_PER_YEAR`, the divisor of the interest formula.
const INTEREST_DIVISOR: u128 = BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128;

/// Simple (non-compounding) interest on `principal` at `rate_bps` for
/// `elapsed_secs` seconds, rounded down.
///
/// Negative inputs are unrepresentable by construction, so the only failure
/// is a result too large for [`Amount`].
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the result exceeds `u128::MAX`.
pub fn interest(principal: Amount, rate_bps: u32, elapsed_secs: u64) -> Result<Amount, LedgerError> {
    if principal == 0 || rate_bps == 0 || elapsed_secs == 0 {
        return Ok(0);
    }

    // u128 * u32 * u64 < 2^224, so the product always fits.
    let numerator = U256::from(principal) * U256::from(rate_bps) * U256::from(elapsed_secs);
    let quotient = numerator / U256::from(INTEREST_DIVISOR);

    if quotient > U256::from(u128::MAX) {
        return Err(LedgerError::Overflow);
    }
    Ok(quotient.as_u128())
}
