//! Beefy auto-compounding vault. Deposits mint mooTokens at the vault's
//! `getPricePerFullShare`; withdrawals pay a fee, so the position is valued net
//! of it and partial exits gross the request up.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{
    burn_within, ensure_position, units_for, value_of, VenueReport, YieldSource, EXP_SCALE,
};
use crate::error::VenueError;
use crate::vault_standards::mul_div::{gross_up, net_of_fee, Rounding, BPS_DENOMINATOR};

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct BeefyReport {
    /// Underlying per mooToken, scaled by 1e18.
    pub price_per_full_share: U128,
    pub withdrawal_fee_bps: u16,
    pub paused: bool,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct BeefyVault {
    moo_tokens: u128,
    price_per_full_share: u128,
    withdrawal_fee_bps: u16,
    paused: bool,
}

impl BeefyVault {
    pub fn moo_tokens(&self) -> u128 {
        self.moo_tokens
    }

    fn gross_value(&self) -> u128 {
        value_of(self.moo_tokens, self.price_per_full_share, EXP_SCALE)
    }
}

impl YieldSource for BeefyVault {
    fn position_value(&self) -> u128 {
        net_of_fee(self.gross_value(), self.withdrawal_fee_bps)
    }

    fn unit_price(&self) -> u128 {
        self.price_per_full_share
    }

    fn withdrawable(&self) -> u128 {
        self.position_value()
    }

    fn is_operational(&self) -> bool {
        !self.paused
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        if self.paused {
            return Err(VenueError::SupplyPaused);
        }
        let minted = units_for(assets, self.price_per_full_share, EXP_SCALE, Rounding::Down)?;
        if minted == 0 {
            return Err(VenueError::ZeroOutput);
        }
        self.moo_tokens = self
            .moo_tokens
            .checked_add(minted)
            .ok_or(VenueError::Overflow)?;
        Ok(minted)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        ensure_position(assets, self.position_value())?;
        let gross = gross_up(assets, self.withdrawal_fee_bps).ok_or(VenueError::Overflow)?;
        let (price, fee_bps) = (self.price_per_full_share, self.withdrawal_fee_bps);
        let upper = units_for(gross, price, EXP_SCALE, Rounding::Up)?;
        let (burned, released) = burn_within(assets, self.moo_tokens, upper, |units| {
            net_of_fee(value_of(units, price, EXP_SCALE), fee_bps)
        });
        self.moo_tokens -= burned;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        let value = self.position_value();
        self.moo_tokens = 0;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, _now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Beefy(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.price_per_full_share.0 == 0 {
            return Err(VenueError::InvalidReport("price_per_full_share"));
        }
        if r.withdrawal_fee_bps as u128 >= BPS_DENOMINATOR {
            return Err(VenueError::InvalidReport("withdrawal_fee_bps"));
        }
        self.price_per_full_share = r.price_per_full_share.0;
        self.withdrawal_fee_bps = r.withdrawal_fee_bps;
        self.paused = r.paused;
        Ok(())
    }
}
