//! Annualized yield estimate derived from a venue's unit price.
//!
//! Each keeper report carries the venue's price of one native unit. The change
//! between two reports is annualized and blended into the running estimate,
//! weighted by how much of [`APY_WINDOW_NS`] the observation spans, so a short
//! noisy interval moves the estimate less than a long one.

use near_sdk::near;

use crate::config::{NS_PER_DAY, NS_PER_YEAR};
use crate::vault_standards::mul_div::{checked_mul_div, Rounding, BPS_DENOMINATOR};

/// An observation spanning this long replaces the estimate outright.
pub const APY_WINDOW_NS: u64 = 7 * NS_PER_DAY;

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApyTracker {
    apy_bps: i64,
    last_unit_price: u128,
    last_observed_ns: u64,
}

impl ApyTracker {
    pub fn new(initial_apy_bps: i64, unit_price: u128, now_ns: u64) -> Self {
        Self {
            apy_bps: initial_apy_bps,
            last_unit_price: unit_price,
            last_observed_ns: now_ns,
        }
    }

    pub fn apy_bps(&self) -> i64 {
        self.apy_bps
    }

    /// Folds a new unit price observation into the estimate.
    pub fn observe(&mut self, unit_price: u128, now_ns: u64) {
        if now_ns <= self.last_observed_ns {
            return;
        }
        let elapsed = now_ns - self.last_observed_ns;
        if self.last_unit_price > 0 {
            let observed = annualized_bps(self.last_unit_price, unit_price, elapsed);
            let weight = elapsed.min(APY_WINDOW_NS) as i128;
            let current = self.apy_bps as i128;
            let blended = current + (observed - current) * weight / APY_WINDOW_NS as i128;
            self.apy_bps = blended.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        }
        self.last_unit_price = unit_price;
        self.last_observed_ns = now_ns;
    }
}

/// Annualized relative change from `previous` to `current` over `elapsed_ns`, in bps.
fn annualized_bps(previous: u128, current: u128, elapsed_ns: u64) -> i128 {
    let (delta, negative) = if current >= previous {
        (current - previous, false)
    } else {
        (previous - current, true)
    };
    let scale = BPS_DENOMINATOR * NS_PER_YEAR as u128;
    // A jump from a dust price saturates instead of overflowing.
    let per_ns = checked_mul_div(delta, scale, previous, Rounding::Down)
        .map(|annual| annual / elapsed_ns as u128)
        .unwrap_or(u128::MAX);
    let magnitude = per_ns.min(i64::MAX as u128) as i128;
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
