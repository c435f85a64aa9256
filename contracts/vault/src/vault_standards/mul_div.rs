//! # Fixed-Point Helpers
//!
//! Share/asset conversions, venue unit conversions and fee math, all on
//! 256-bit intermediates so `u128` products cannot overflow.
//!
//! Rounding always favors the pool:
//! - Use `Down` when calculating shares to mint or assets to pay out
//! - Use `Up` when calculating shares or venue units to burn

use super::core::U256;
use crate::error::VaultError;

/// Denominator of basis-point quantities.
pub const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Floor.
    Down,
    /// Ceiling.
    Up,
}

/// `x * y / denominator` in 256 bits, rounded as requested.
fn div_rounded(x: u128, y: u128, denominator: u128, rounding: Rounding) -> U256 {
    let numerator = U256::from(x) * U256::from(y);
    let (quotient, remainder) = numerator.div_mod(U256::from(denominator));
    match rounding {
        Rounding::Up if !remainder.is_zero() => quotient + U256::one(),
        _ => quotient,
    }
}

/// `(x * y) / denominator` without intermediate overflow.
///
/// # Panics
///
/// Panics if `denominator` is zero or the result does not fit in `u128`.
/// Callers guard both; use [`checked_mul_div`] where the inputs are untrusted.
///
/// ```ignore
/// // shares = assets * supply / total_assets, rounded down
/// assert_eq!(mul_div(100_000, 1_000_000, 500_000, Rounding::Down), 200_000);
/// ```
pub fn mul_div(x: u128, y: u128, denominator: u128, rounding: Rounding) -> u128 {
    div_rounded(x, y, denominator, rounding).as_u128()
}

/// Fallible variant of [`mul_div`].
///
/// Returns [`VaultError::MathOverflow`] on a zero denominator or a result
/// wider than `u128`.
pub fn checked_mul_div(
    x: u128,
    y: u128,
    denominator: u128,
    rounding: Rounding,
) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::MathOverflow);
    }
    let result = div_rounded(x, y, denominator, rounding);
    if result > U256::from(u128::MAX) {
        return Err(VaultError::MathOverflow);
    }
    Ok(result.as_u128())
}

/// Amount left after deducting a fee of `fee_bps` basis points, rounded down.
pub fn net_of_fee(amount: u128, fee_bps: u16) -> u128 {
    let keep = BPS_DENOMINATOR.saturating_sub(fee_bps as u128);
    mul_div(amount, keep, BPS_DENOMINATOR, Rounding::Down)
}

/// Gross amount that nets at least `amount` after a fee of `fee_bps`, rounded up.
///
/// A fee of 100% or more cannot be grossed up and yields `None`.
pub fn gross_up(amount: u128, fee_bps: u16) -> Option<u128> {
    let keep = BPS_DENOMINATOR.checked_sub(fee_bps as u128)?;
    if keep == 0 {
        return None;
    }
    checked_mul_div(amount, BPS_DENOMINATOR, keep, Rounding::Up).ok()
}
