//! Venus money market: supplied assets are held as vTokens whose exchange rate
//! grows as borrowers pay interest. Redemptions are bounded by market cash.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    accrue_index, burn_within, ensure_liquidity, ensure_position, units_for, value_of,
    VenueReport, YieldSource, EXP_SCALE,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::Rounding;

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct VenusReport {
    /// Underlying per vToken, scaled by 1e18.
    pub exchange_rate: U128,
    /// Underlying held by the market and available for redemption.
    pub cash: U128,
    pub supply_rate_bps: u32,
    pub mint_paused: bool,
    pub redeem_paused: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct VenusMarket {
    v_tokens: u128,
    exchange_rate: u128,
    cash: u128,
    supply_rate_bps: u32,
    mint_paused: bool,
    redeem_paused: bool,
    last_accrual_ns: u64,
}

impl VenusMarket {
    pub fn v_tokens(&self) -> u128 {
        self.v_tokens
    }
}

impl YieldSource for VenusMarket {
    fn position_value(&self) -> u128 {
        value_of(self.v_tokens, self.exchange_rate, EXP_SCALE)
    }

    fn unit_price(&self) -> u128 {
        self.exchange_rate
    }

    fn withdrawable(&self) -> u128 {
        if self.redeem_paused {
            return 0;
        }
        self.position_value().min(self.cash)
    }

    fn is_operational(&self) -> bool {
        !self.mint_paused && !self.redeem_paused
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.mint_paused {
            return Err(VenueError::SupplyPaused);
        }
        let minted = units_for(assets, self.exchange_rate, EXP_SCALE, Rounding::Down)?;
        if minted == 0 {
            return Err(VenueError::ZeroOutput);
        }
        let v_tokens = self.v_tokens.checked_add(minted).ok_or(VenueError::Overflow)?;
        let cash = self.cash.checked_add(assets).ok_or(VenueError::Overflow)?;
        self.v_tokens = v_tokens;
        self.cash = cash;
        Ok(minted)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.redeem_paused {
            return Err(VenueError::WithdrawPaused);
        }
        ensure_position(assets, self.position_value())?;
        ensure_liquidity(assets, self.cash)?;
        let rate = self.exchange_rate;
        let upper = units_for(assets, rate, EXP_SCALE, Rounding::Up)?;
        let (burned, released) =
            burn_within(assets, self.v_tokens, upper, |units| value_of(units, rate, EXP_SCALE));
        self.v_tokens -= burned;
        self.cash -= released;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        if self.redeem_paused {
            return Err(VenueError::WithdrawPaused);
        }
        let value = self.position_value();
        ensure_liquidity(value, self.cash)?;
        self.v_tokens = 0;
        self.cash -= value;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Venus(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.exchange_rate.0 == 0 {
            return Err(VenueError::InvalidReport("exchange_rate"));
        }
        self.exchange_rate = r.exchange_rate.0;
        self.cash = r.cash.0;
        self.supply_rate_bps = r.supply_rate_bps;
        self.mint_paused = r.mint_paused;
        self.redeem_paused = r.redeem_paused;
        self.last_accrual_ns = now_ns;
        Ok(())
    }

    fn accrue(&mut self, now_ns: u64) {
        if now_ns <= self.last_accrual_ns {
            return;
        }
        self.exchange_rate = accrue_index(
            self.exchange_rate,
            self.supply_rate_bps,
            now_ns - self.last_accrual_ns,
        );
        self.last_accrual_ns = now_ns;
    }
}
