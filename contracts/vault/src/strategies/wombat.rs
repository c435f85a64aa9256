//! Wombat single-sided stableswap pool. LP tokens track the asset's liability
//! through an exchange rate; withdrawals pay a haircut, and a pool whose cash
//! covers less than 90% of its liabilities is considered impaired.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    burn_within, ensure_liquidity, ensure_position, units_for, value_of, VenueReport,
    YieldSource, EXP_SCALE,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::{gross_up, net_of_fee, Rounding, BPS_DENOMINATOR};

/// Coverage ratio (cash / liability) below which the pool is unhealthy.
pub const MIN_COVERAGE_RATIO_BPS: u32 = 9_000;

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct WombatReport {
    /// Liability per LP token, scaled by 1e18.
    pub exchange_rate: U128,
    pub cash: U128,
    pub coverage_ratio_bps: u32,
    pub withdrawal_haircut_bps: u16,
    pub paused: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct WombatPool {
    lp_tokens: u128,
    exchange_rate: u128,
    cash: u128,
    coverage_ratio_bps: u32,
    withdrawal_haircut_bps: u16,
    paused: bool,
}

impl WombatPool {
    pub fn lp_tokens(&self) -> u128 {
        self.lp_tokens
    }
}

impl YieldSource for WombatPool {
    fn position_value(&self) -> u128 {
        net_of_fee(
            value_of(self.lp_tokens, self.exchange_rate, EXP_SCALE),
            self.withdrawal_haircut_bps,
        )
    }

    fn unit_price(&self) -> u128 {
        self.exchange_rate
    }

    fn withdrawable(&self) -> u128 {
        if self.paused {
            return 0;
        }
        self.position_value().min(self.cash)
    }

    fn is_operational(&self) -> bool {
        !self.paused && self.coverage_ratio_bps >= MIN_COVERAGE_RATIO_BPS
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.paused {
            return Err(VenueError::SupplyPaused);
        }
        let minted = units_for(assets, self.exchange_rate, EXP_SCALE, Rounding::Down)?;
        if minted == 0 {
            return Err(VenueError::ZeroOutput);
        }
        let lp_tokens = self
            .lp_tokens
            .checked_add(minted)
            .ok_or(VenueError::Overflow)?;
        let cash = self.cash.checked_add(assets).ok_or(VenueError::Overflow)?;
        self.lp_tokens = lp_tokens;
        self.cash = cash;
        Ok(minted)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.paused {
            return Err(VenueError::WithdrawPaused);
        }
        ensure_position(assets, self.position_value())?;
        ensure_liquidity(assets, self.cash)?;
        let gross = gross_up(assets, self.withdrawal_haircut_bps).ok_or(VenueError::Overflow)?;
        let (rate, haircut_bps) = (self.exchange_rate, self.withdrawal_haircut_bps);
        let upper = units_for(gross, rate, EXP_SCALE, Rounding::Up)?;
        let (burned, released) = burn_within(assets, self.lp_tokens, upper, |units| {
            net_of_fee(value_of(units, rate, EXP_SCALE), haircut_bps)
        });
        self.lp_tokens -= burned;
        self.cash -= released;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        if self.paused {
            return Err(VenueError::WithdrawPaused);
        }
        let value = self.position_value();
        ensure_liquidity(value, self.cash)?;
        self.lp_tokens = 0;
        self.cash -= value;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, _now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Wombat(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.exchange_rate.0 == 0 {
            return Err(VenueError::InvalidReport("exchange_rate"));
        }
        if r.withdrawal_haircut_bps as u128 >= BPS_DENOMINATOR {
            return Err(VenueError::InvalidReport("withdrawal_haircut_bps"));
        }
        self.exchange_rate = r.exchange_rate.0;
        self.cash = r.cash.0;
        self.coverage_ratio_bps = r.coverage_ratio_bps;
        self.withdrawal_haircut_bps = r.withdrawal_haircut_bps;
        self.paused = r.paused;
        Ok(())
    }
}
