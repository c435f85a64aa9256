//! Uniswap v3 concentrated-liquidity position. Fees accrue per unit of
//! liquidity through the pool's fee growth accumulator and are owed to the
//! position until collected. A position whose range no longer contains the
//! pool price earns nothing and is reported unhealthy.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    burn_within, ensure_position, units_for, value_of, VenueReport, YieldSource, EXP_SCALE,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::Rounding;

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct UniswapReport {
    /// Underlying per liquidity unit at the current pool price, scaled by 1e18.
    pub price_per_unit: U128,
    /// Cumulative fees per liquidity unit inside the range, scaled by 1e18.
    pub fee_growth_inside: U128,
    pub in_range: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct UniswapPosition {
    liquidity: u128,
    price_per_unit: u128,
    fee_growth_inside_last: u128,
    tokens_owed: u128,
    in_range: bool,
}

impl UniswapPosition {
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn tokens_owed(&self) -> u128 {
        self.tokens_owed
    }
}

impl YieldSource for UniswapPosition {
    fn position_value(&self) -> u128 {
        value_of(self.liquidity, self.price_per_unit, EXP_SCALE).saturating_add(self.tokens_owed)
    }

    fn unit_price(&self) -> u128 {
        self.price_per_unit
            .saturating_add(self.fee_growth_inside_last)
    }

    fn withdrawable(&self) -> u128 {
        self.position_value()
    }

    fn is_operational(&self) -> bool {
        self.in_range
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if !self.in_range {
            return Err(VenueError::SupplyPaused);
        }
        let minted = units_for(assets, self.price_per_unit, EXP_SCALE, Rounding::Down)?;
        if minted == 0 {
            return Err(VenueError::ZeroOutput);
        }
        self.liquidity = self
            .liquidity
            .checked_add(minted)
            .ok_or(VenueError::Overflow)?;
        Ok(minted)
    }

    /// Collects owed fees first, then decreases liquidity for the rest.
    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        ensure_position(assets, self.position_value())?;
        let from_fees = assets.min(self.tokens_owed);
        let rest = assets - from_fees;
        let price = self.price_per_unit;
        let upper = units_for(rest, price, EXP_SCALE, Rounding::Up)?;
        let (burned, released) =
            burn_within(rest, self.liquidity, upper, |units| value_of(units, price, EXP_SCALE));
        self.tokens_owed -= from_fees;
        self.liquidity -= burned;
        Ok(from_fees + released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        let value = self.position_value();
        self.liquidity = 0;
        self.tokens_owed = 0;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, _now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Uniswap(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.price_per_unit.0 == 0 {
            return Err(VenueError::InvalidReport("price_per_unit"));
        }
        if r.fee_growth_inside.0 < self.fee_growth_inside_last {
            return Err(VenueError::InvalidReport("fee_growth_inside"));
        }
        let earned = value_of(
            self.liquidity,
            r.fee_growth_inside.0 - self.fee_growth_inside_last,
            EXP_SCALE,
        );
        self.tokens_owed = self
            .tokens_owed
            .checked_add(earned)
            .ok_or(VenueError::Overflow)?;
        self.fee_growth_inside_last = r.fee_growth_inside.0;
        self.price_per_unit = r.price_per_unit.0;
        self.in_range = r.in_range;
        Ok(())
    }
}
