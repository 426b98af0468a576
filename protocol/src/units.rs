//! # Decimal Units
//!
//! The ledger only ever sees integers in the smallest indivisible unit. Humans
//! type `"200"` or `"0.5"`. This module is the border crossing: it turns a
//! decimal string into base units (`parse_units("1.5", 18)` is
//! `1_500_000_000_000_000_000`) and back again for display.
//!
//! No floating point is involved at any step.

use thiserror::Error;

use crate::accrual::Amount;
use crate::config::BPS_DENOMINATOR;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing a decimal amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    /// The input was empty (or only a decimal point).
    #[error("empty amount")]
    Empty,

    /// The input contained something other than digits and one `.`.
    #[error("invalid amount '{0}': expected digits with an optional decimal point")]
    Malformed(String),

    /// More fractional digits than the asset supports.
    #[error("amount '{input}' has more than {decimals} decimal places")]
    TooPrecise {
        /// The raw input.
        input: String,
        /// Decimal places supported by the asset.
        decimals: u8,
    },

    /// The amount does not fit into the base-unit integer type.
    #[error("amount '{0}' overflows")]
    Overflow(String),
}

/// Parses a decimal string into base units with `decimals` fractional digits.
///
/// # Errors
///
/// See [`UnitsError`]. Excess precision is rejected rather than rounded --
/// silently dropping wei is how accounting bugs start.
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, UnitsError> {
    let trimmed = input.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Empty);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(UnitsError::Malformed(trimmed.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: trimmed.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(trimmed.to_string());
    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or_else(overflow)?;

    let whole_units: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse::<Amount>().map_err(|_| overflow())?
    };

    let frac_units: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse::<Amount>().map_err(|_| overflow())?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Formats base units as a decimal string, trimming trailing zeros.
///
/// `format_units(1_643_835_616_438_356_164, 18)` is `"1.643835616438356164"`;
/// `format_units(200 * 10^18, 18)` is `"200"`.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let Some(scale) = 10u128.checked_pow(decimals as u32) else {
        // More decimals than a u128 can scale: everything is fractional.
        return format!("0.{:0>width$}", amount, width = decimals as usize)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    };

    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Renders a basis-point rate as a percentage, e.g. 500 bps -> `"5.00%"`.
pub fn format_rate_bps(rate_bps: u32) -> String {
    let hundredths = BPS_DENOMINATOR / 100;
    let rate = rate_bps as u64;
    format!("{}.{:02}%", rate / hundredths, rate % hundredths)
}
