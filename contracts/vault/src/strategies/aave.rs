//! Aave v3 reserve. The aToken balance is stored scaled by the reserve's
//! liquidity index (a ray). A frozen reserve accepts no supply but still
//! releases funds; a paused reserve does neither.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    accrue_index, burn_within, ensure_liquidity, ensure_position, units_for, value_of,
    VenueReport, YieldSource,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::Rounding;

/// 1e27 fixed-point unit of Aave indices.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct AaveReport {
    pub liquidity_index: U128,
    pub available_liquidity: U128,
    pub liquidity_rate_bps: u32,
    pub is_frozen: bool,
    pub is_paused: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct AaveReserve {
    scaled_balance: u128,
    liquidity_index: u128,
    available_liquidity: u128,
    liquidity_rate_bps: u32,
    is_frozen: bool,
    is_paused: bool,
    last_accrual_ns: u64,
}

impl AaveReserve {
    pub fn scaled_balance(&self) -> u128 {
        self.scaled_balance
    }
}

impl YieldSource for AaveReserve {
    fn position_value(&self) -> u128 {
        value_of(self.scaled_balance, self.liquidity_index, RAY)
    }

    fn unit_price(&self) -> u128 {
        self.liquidity_index
    }

    fn withdrawable(&self) -> u128 {
        if self.is_paused {
            return 0;
        }
        self.position_value().min(self.available_liquidity)
    }

    fn is_operational(&self) -> bool {
        !self.is_paused && !self.is_frozen
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.is_paused || self.is_frozen {
            return Err(VenueError::SupplyPaused);
        }
        let scaled = units_for(assets, self.liquidity_index, RAY, Rounding::Down)?;
        if scaled == 0 {
            return Err(VenueError::ZeroOutput);
        }
        let balance = self
            .scaled_balance
            .checked_add(scaled)
            .ok_or(VenueError::Overflow)?;
        let liquidity = self
            .available_liquidity
            .checked_add(assets)
            .ok_or(VenueError::Overflow)?;
        self.scaled_balance = balance;
        self.available_liquidity = liquidity;
        Ok(scaled)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.is_paused {
            return Err(VenueError::WithdrawPaused);
        }
        ensure_position(assets, self.position_value())?;
        ensure_liquidity(assets, self.available_liquidity)?;
        let index = self.liquidity_index;
        let upper = units_for(assets, index, RAY, Rounding::Up)?;
        let (burned, released) =
            burn_within(assets, self.scaled_balance, upper, |units| value_of(units, index, RAY));
        self.scaled_balance -= burned;
        self.available_liquidity -= released;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        if self.is_paused {
            return Err(VenueError::WithdrawPaused);
        }
        let value = self.position_value();
        ensure_liquidity(value, self.available_liquidity)?;
        self.scaled_balance = 0;
        self.available_liquidity -= value;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Aave(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.liquidity_index.0 < RAY {
            return Err(VenueError::InvalidReport("liquidity_index"));
        }
        self.liquidity_index = r.liquidity_index.0;
        self.available_liquidity = r.available_liquidity.0;
        self.liquidity_rate_bps = r.liquidity_rate_bps;
        self.is_frozen = r.is_frozen;
        self.is_paused = r.is_paused;
        self.last_accrual_ns = now_ns;
        Ok(())
    }

    fn accrue(&mut self, now_ns: u64) {
        if now_ns <= self.last_accrual_ns {
            return;
        }
        self.liquidity_index = accrue_index(
            self.liquidity_index,
            self.liquidity_rate_bps,
            now_ns - self.last_accrual_ns,
        );
        self.last_accrual_ns = now_ns;
    }
}
