//! Compound III (Comet) base-asset supply. Balances are stored as principal
//! scaled by the base supply index, which starts at 1e15 and only grows.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    accrue_index, burn_within, ensure_liquidity, ensure_position, units_for, value_of,
    VenueReport, YieldSource,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::Rounding;

/// Fixed-point scale of Comet's supply index.
pub const BASE_INDEX_SCALE: u128 = 1_000_000_000_000_000;

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct CompoundReport {
    pub base_supply_index: U128,
    /// Base asset held by the Comet contract.
    pub base_balance: U128,
    pub supply_rate_bps: u32,
    pub supply_paused: bool,
    pub withdraw_paused: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct CometMarket {
    principal: u128,
    base_supply_index: u128,
    base_balance: u128,
    supply_rate_bps: u32,
    supply_paused: bool,
    withdraw_paused: bool,
    last_accrual_ns: u64,
}

impl CometMarket {
    /// Index-scaled principal, as Comet's `userBasic.principal`.
    pub fn principal(&self) -> u128 {
        self.principal
    }
}

impl YieldSource for CometMarket {
    fn position_value(&self) -> u128 {
        value_of(self.principal, self.base_supply_index, BASE_INDEX_SCALE)
    }

    fn unit_price(&self) -> u128 {
        self.base_supply_index
    }

    fn withdrawable(&self) -> u128 {
        if self.withdraw_paused {
            return 0;
        }
        self.position_value().min(self.base_balance)
    }

    fn is_operational(&self) -> bool {
        !self.supply_paused && !self.withdraw_paused
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.supply_paused {
            return Err(VenueError::SupplyPaused);
        }
        let scaled = units_for(
            assets,
            self.base_supply_index,
            BASE_INDEX_SCALE,
            Rounding::Down,
        )?;
        if scaled == 0 {
            return Err(VenueError::ZeroOutput);
        }
        let principal = self
            .principal
            .checked_add(scaled)
            .ok_or(VenueError::Overflow)?;
        let base_balance = self
            .base_balance
            .checked_add(assets)
            .ok_or(VenueError::Overflow)?;
        self.principal = principal;
        self.base_balance = base_balance;
        Ok(scaled)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.withdraw_paused {
            return Err(VenueError::WithdrawPaused);
        }
        ensure_position(assets, self.position_value())?;
        ensure_liquidity(assets, self.base_balance)?;
        let index = self.base_supply_index;
        let upper = units_for(assets, index, BASE_INDEX_SCALE, Rounding::Up)?;
        let (burned, released) = burn_within(assets, self.principal, upper, |units| {
            value_of(units, index, BASE_INDEX_SCALE)
        });
        self.principal -= burned;
        self.base_balance -= released;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        if self.withdraw_paused {
            return Err(VenueError::WithdrawPaused);
        }
        let value = self.position_value();
        ensure_liquidity(value, self.base_balance)?;
        self.principal = 0;
        self.base_balance -= value;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Compound(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.base_supply_index.0 < BASE_INDEX_SCALE {
            return Err(VenueError::InvalidReport("base_supply_index"));
        }
        self.base_supply_index = r.base_supply_index.0;
        self.base_balance = r.base_balance.0;
        self.supply_rate_bps = r.supply_rate_bps;
        self.supply_paused = r.supply_paused;
        self.withdraw_paused = r.withdraw_paused;
        self.last_accrual_ns = now_ns;
        Ok(())
    }

    fn accrue(&mut self, now_ns: u64) {
        if now_ns <= self.last_accrual_ns {
            return;
        }
        self.base_supply_index = accrue_index(
            self.base_supply_index,
            self.supply_rate_bps,
            now_ns - self.last_accrual_ns,
        );
        self.last_accrual_ns = now_ns;
    }
}
