//! MetaMorpho ERC-4626 vault. The vault's own totals price its shares;
//! deposits respect the supply cap and withdrawals are served from the
//! liquidity idle across its markets.

use near_sdk::json_types::U128;
use near_sdk::near;

use super::{ensure_liquidity, ensure_position, VenueReport, YieldSource, EXP_SCALE};
use crate::error::VenueError;
use crate::vault_standards::mul_div::{checked_mul_div, Rounding};

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct MorphoReport {
    pub total_assets: U128,
    pub total_supply: U128,
    pub idle_liquidity: U128,
    /// Zero means uncapped.
    pub supply_cap: U128,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, Default)]
pub struct MorphoVault {
    shares: u128,
    total_assets: u128,
    total_supply: u128,
    idle_liquidity: u128,
    supply_cap: u128,
}

impl MorphoVault {
    pub fn shares(&self) -> u128 {
        self.shares
    }

    /// ERC-4626 `convertToShares`.
    fn to_shares(&self, assets: u128, rounding: Rounding) -> Result<u128, VenueError> {
        if self.total_supply == 0 {
            return Ok(assets);
        }
        checked_mul_div(assets, self.total_supply, self.total_assets, rounding)
            .map_err(|_| VenueError::Overflow)
    }

    /// ERC-4626 `convertToAssets`.
    fn to_assets(&self, shares: u128) -> u128 {
        if self.total_supply == 0 {
            return shares;
        }
        checked_mul_div(shares, self.total_assets, self.total_supply, Rounding::Down)
            .unwrap_or(u128::MAX)
    }
}

impl YieldSource for MorphoVault {
    fn position_value(&self) -> u128 {
        self.to_assets(self.shares)
    }

    fn unit_price(&self) -> u128 {
        self.to_assets(EXP_SCALE)
    }

    fn withdrawable(&self) -> u128 {
        self.position_value().min(self.idle_liquidity)
    }

    fn is_operational(&self) -> bool {
        self.total_supply == 0 || self.total_assets > 0
    }

    fn supply(&mut self, assets: u128) -> Result<u128, VenueError> {
        let total_assets = self
            .total_assets
            .checked_add(assets)
            .ok_or(VenueError::Overflow)?;
        if self.supply_cap > 0 && total_assets > self.supply_cap {
            return Err(VenueError::SupplyCapReached {
                cap: self.supply_cap,
            });
        }
        let minted = self.to_shares(assets, Rounding::Down)?;
        if minted == 0 {
            return Err(VenueError::ZeroOutput);
        }
        let total_supply = self
            .total_supply
            .checked_add(minted)
            .ok_or(VenueError::Overflow)?;
        self.shares += minted;
        self.total_supply = total_supply;
        self.total_assets = total_assets;
        self.idle_liquidity = self.idle_liquidity.saturating_add(assets);
        Ok(minted)
    }

    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError> {
        ensure_position(assets, self.position_value())?;
        ensure_liquidity(assets, self.idle_liquidity)?;
        // ERC-4626 `redeem`: whole shares rounded down, paid at their floored value.
        let burned = self.to_shares(assets, Rounding::Down)?.min(self.shares);
        let released = self.to_assets(burned).min(assets);
        self.shares -= burned;
        self.total_supply = self.total_supply.saturating_sub(burned);
        self.total_assets = self.total_assets.saturating_sub(released);
        self.idle_liquidity -= released;
        Ok(released)
    }

    fn redeem_all(&mut self) -> Result<u128, VenueError> {
        let value = self.position_value();
        ensure_liquidity(value, self.idle_liquidity)?;
        self.total_supply = self.total_supply.saturating_sub(self.shares);
        self.total_assets = self.total_assets.saturating_sub(value);
        self.idle_liquidity -= value;
        self.shares = 0;
        Ok(value)
    }

    fn apply_report(&mut self, report: &VenueReport, _now_ns: u64) -> Result<(), VenueError> {
        let VenueReport::Morpho(r) = report else {
            return Err(VenueError::ReportMismatch);
        };
        if r.total_supply.0 < self.shares {
            return Err(VenueError::InvalidReport("total_supply"));
        }
        if r.total_supply.0 > 0 && r.total_assets.0 == 0 && self.shares == 0 {
            return Err(VenueError::InvalidReport("total_assets"));
        }
        self.total_assets = r.total_assets.0;
        self.total_supply = r.total_supply.0;
        self.idle_liquidity = r.idle_liquidity.0;
        self.supply_cap = r.supply_cap.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(total_assets: u128, total_supply: u128, idle: u128, cap: u128) -> MorphoVault {
        let mut v = MorphoVault::default();
        v.apply_report(
            &VenueReport::Morpho(MorphoReport {
                total_assets: U128(total_assets),
                total_supply: U128(total_supply),
                idle_liquidity: U128(idle),
                supply_cap: U128(cap),
            }),
            0,
        )
        .unwrap();
        v
    }

    #[test]
    fn shares_priced_by_vault_totals() {
        let mut v = vault(2_000, 1_000, 0, 0);
        assert_eq!(v.supply(500).unwrap(), 250);
        assert_eq!(v.position_value(), 500);
        assert_eq!(v.unit_price(), 2 * EXP_SCALE);
    }

    #[test]
    fn supply_cap_is_enforced() {
        let mut v = vault(900, 900, 0, 1_000);
        assert_eq!(v.supply(101), Err(VenueError::SupplyCapReached { cap: 1_000 }));
        assert_eq!(v.supply(100).unwrap(), 100);
    }

    #[test]
    fn withdrawals_limited_by_idle_liquidity() {
        let mut v = vault(1_000, 1_000, 0, 0);
        v.supply(1_000).unwrap();
        assert_eq!(v.withdrawable(), 1_000);
        v.apply_report(
            &VenueReport::Morpho(MorphoReport {
                total_assets: U128(2_000),
                total_supply: U128(2_000),
                idle_liquidity: U128(250),
                supply_cap: U128(0),
            }),
            1,
        )
        .unwrap();
        assert!(matches!(
            v.redeem_all(),
            Err(VenueError::InsufficientLiquidity { .. })
        ));
        assert_eq!(v.redeem(250).unwrap(), 250);
        assert_eq!(v.position_value(), 750);
    }

    #[test]
    fn report_cannot_shrink_supply_below_position() {
        let mut v = vault(0, 0, 0, 0);
        v.supply(100).unwrap();
        let report = VenueReport::Morpho(MorphoReport {
            total_assets: U128(50),
            total_supply: U128(50),
            idle_liquidity: U128(0),
            supply_cap: U128(0),
        });
        assert_eq!(v.apply_report(&report, 1), Err(VenueError::InvalidReport("total_supply")));
    }
}
