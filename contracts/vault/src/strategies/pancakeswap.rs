//! PancakeSwap stable-swap liquidity staked in a farm. Deposits are zapped
//! single-sided into the pool (paying the zap fee) and the LP is staked.
//! Harvested CAKE is sold and compounded back into LP.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    burn_within, ensure_position, units_for, value_of, VenueReport, YieldSource, EXP_SCALE,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::{net_of_fee, Rounding, BPS_DENOMINATOR};

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct PancakeReport {
    /// Underlying per LP token, scaled by 1e18.
    pub virtual_price: U128,
    pub zap_fee_bps: u16,
    /// Rewards harvested for the vault's stake since the last report, in asset units.
    pub harvested_rewards: U128,
    pub farm_paused: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct PancakeFarm {
    lp_tokens: u128,
    virtual_price: u128,
    zap_fee_bps: u16,
    farm_paused: bool,
    /// Cumulative growth of one LP deposited at inception, including compounding.
    compound_index: u128,
}

impl PancakeFarm {
    pub fn lp_tokens(&self) -> u128 {
        self.lp_tokens
    }
}

impl YieldSource for PancakeFarm {
    fn position_value(&self) -> u128 {
        value_of(self.lp_tokens, self.virtual_price, EXP_SCALE)
    }

    fn unit_price(&self) -> u128 {
        value_of(self.virtual_price, self.compound_index, EXP_SCALE)
    }

    fn withdrawable(&self) -> u128 {
        self.position_value()
    }

    fn is_operational(&self) -> bool {
        !self.farm_paused
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.farm_paused {
            return Err(VenueError::SupplyPaused);
        }
        let net = net_of_fee(assets, self.zap_fee_bps);
        let minted = units_for(net, self.virtual_price, EXP_SCALE, Rounding::Down)?;
        if minted == 0 {
            return Err(VenueError::ZeroOutput);
        }
        self.lp_tokens = self
            .lp_tokens
            .checked_add(minted)
            .ok_or(VenueError::Overflow)?;
        Ok(minted)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        ensure_position(assets, self.position_value())?;
        let price = self.virtual_price;
        let upper = units_for(assets, price, EXP_SCALE, Rounding::Up)?;
        let (burned, released) =
            burn_within(assets, self.lp_tokens, upper, |units| value_of(units, price, EXP_SCALE));
        self.lp_tokens -= burned;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        let value = self.position_value();
        self.lp_tokens = 0;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, _now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::PancakeSwap(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.virtual_price.0 == 0 {
            return Err(VenueError::InvalidReport("virtual_price"));
        }
        if r.zap_fee_bps as u128 >= BPS_DENOMINATOR {
            return Err(VenueError::InvalidReport("zap_fee_bps"));
        }
        // Nothing is staked yet, so nothing was harvested for the vault.
        let compounded = if self.lp_tokens == 0 {
            0
        } else {
            units_for(
                r.harvested_rewards.0,
                r.virtual_price.0,
                EXP_SCALE,
                Rounding::Down,
            )?
        };
        let lp_tokens = self
            .lp_tokens
            .checked_add(compounded)
            .ok_or(VenueError::Overflow)?;
        let index = if self.compound_index == 0 {
            EXP_SCALE
        } else if self.lp_tokens > 0 {
            value_of(self.compound_index, lp_tokens, self.lp_tokens)
        } else {
            self.compound_index
        };
        self.lp_tokens = lp_tokens;
        self.compound_index = index;
        self.virtual_price = r.virtual_price.0;
        self.zap_fee_bps = r.zap_fee_bps;
        self.farm_paused = r.farm_paused;
        Ok(())
    }
}
