//! # Strategy Adapters
//!
//! A [`StrategyAdapter`] owns the vault's position at one external yield venue
//! and the per-account principal deposited through it. Venues differ in their
//! native accounting unit and failure modes; each is modelled in its own
//! module behind the [`YieldSource`] trait and selected through the closed
//! [`Venue`] enum.
//!
//! Venue market state (exchange rates, indices, liquidity, pause flags) is
//! pushed by the strategy controller as a [`StrategyReport`]. Between reports
//! lending venues accrue interest at the last reported supply rate.
//!
//! ## Venues
//!
//! - [`venus`]: vTokens priced by an exchange rate
//! - [`compound`]: Comet principal scaled by the base supply index
//! - [`aave`]: scaled aToken balance times the liquidity index
//! - [`beefy`]: mooTokens priced per full share, withdrawal fee
//! - [`morpho`]: ERC-4626 vault shares, supply cap and idle liquidity
//! - [`pancakeswap`]: stable-swap LP with compounding farm rewards
//! - [`uniswap`]: concentrated liquidity plus uncollected fees
//! - [`wombat`]: single-sided LP with coverage-ratio haircut

use near_sdk::json_types::{U128, U64};
use near_sdk::serde::Serialize;
use near_sdk::store::IterableMap;
use near_sdk::{env, near, AccountId};
use schemars::JsonSchema;

use crate::error::{VaultError, VenueError};
use crate::registry::StrategyId;
use crate::vault_standards::mul_div::{checked_mul_div, mul_div, Rounding};
use crate::StorageKey;

pub mod aave;
pub mod apy;
pub mod beefy;
pub mod compound;
pub mod morpho;
pub mod pancakeswap;
pub mod uniswap;
pub mod venus;
pub mod wombat;

use aave::{AaveReport, AaveReserve};
use apy::ApyTracker;
use beefy::{BeefyReport, BeefyVault};
use compound::{CometMarket, CompoundReport};
use morpho::{MorphoReport, MorphoVault};
use pancakeswap::{PancakeFarm, PancakeReport};
use uniswap::{UniswapPosition, UniswapReport};
use venus::{VenusMarket, VenusReport};
use wombat::{WombatPool, WombatReport};

/// Fixed-point scale of most venue prices.
pub const EXP_SCALE: u128 = 1_000_000_000_000_000_000;

// ============================================================================
// Venue capability
// ============================================================================

/// Operations every venue position supports.
///
/// Amounts are in units of the vault asset unless named `units`. Mutating
/// methods validate first and only change state when they return `Ok`.
pub trait YieldSource {
    /// Asset value of the position, net of exit costs.
    fn position_value(&self) -> u128;
    /// Venue price of one native unit, in the venue's own fixed-point scale.
    fn unit_price(&self) -> u128;
    /// Assets the venue would release right now.
    fn withdrawable(&self) -> u128;
    /// Venue-specific health: not paused, in range, sufficiently covered.
    fn is_operational(&self) -> bool;
    /// Supplies `assets` and returns the native units received.
    fn supply(&mut self, assets: u128) -> Result<u128, VenueError>;
    /// Withdraws up to `assets` in whole native units and returns the assets
    /// released. The position loses no more value than is released.
    fn redeem(&mut self, assets: u128) -> Result<u128, VenueError>;
    /// Closes the position and returns the assets received.
    fn redeem_all(&mut self) -> Result<u128, VenueError>;
    /// Replaces the venue market state with a keeper report.
    fn apply_report(&mut self, report: &VenueReport, now_ns: u64) -> Result<(), VenueError>;
    /// Accrues interest up to `now_ns`.
    fn accrue(&mut self, _now_ns: u64) {}
}

/// Native units worth `assets` at `price` (asset per unit, scaled by `scale`).
pub(crate) fn units_for(
    assets: u128,
    price: u128,
    scale: u128,
    rounding: Rounding,
) -> Result<u128, VenueError> {
    checked_mul_div(assets, scale, price, rounding).map_err(|_| VenueError::Overflow)
}

/// Asset value of `units` at `price`, rounded down and saturating.
pub(crate) fn value_of(units: u128, price: u128, scale: u128) -> u128 {
    checked_mul_div(units, price, scale, Rounding::Down).unwrap_or(u128::MAX)
}

/// Largest burn of whole units, at most `upper`, whose value loss stays within `assets`.
///
/// `value` prices a unit balance and is non-decreasing. Returns the units
/// burned and the value they take out of a position of `units`, so a
/// withdrawal never costs the position more than it releases.
pub(crate) fn burn_within(
    assets: u128,
    units: u128,
    upper: u128,
    value: impl Fn(u128) -> u128,
) -> (u128, u128) {
    let before = value(units);
    let released = |burned: u128| before.saturating_sub(value(units - burned));
    let mut hi = upper.min(units);
    if released(hi) <= assets {
        return (hi, released(hi));
    }
    let mut lo = 0;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if released(mid) <= assets {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    (lo, released(lo))
}

/// Simple interest on `index` at `rate_bps` per year over `elapsed_ns`.
pub(crate) fn accrue_index(index: u128, rate_bps: u32, elapsed_ns: u64) -> u128 {
    let growth = rate_bps as u128 * elapsed_ns as u128;
    let denominator =
        crate::vault_standards::mul_div::BPS_DENOMINATOR * crate::config::NS_PER_YEAR as u128;
    index.saturating_add(mul_div(index, growth, denominator, Rounding::Down))
}

pub(crate) fn ensure_position(requested: u128, available: u128) -> Result<(), VenueError> {
    if requested > available {
        return Err(VenueError::InsufficientPosition {
            requested,
            available,
        });
    }
    Ok(())
}

pub(crate) fn ensure_liquidity(requested: u128, available: u128) -> Result<(), VenueError> {
    if requested > available {
        return Err(VenueError::InsufficientLiquidity {
            requested,
            available,
        });
    }
    Ok(())
}

// ============================================================================
// Venue dispatch
// ============================================================================

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterKind {
    Venus,
    Compound,
    Aave,
    Beefy,
    Morpho,
    PancakeSwap,
    Uniswap,
    Wombat,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Venus => "venus",
            AdapterKind::Compound => "compound",
            AdapterKind::Aave => "aave",
            AdapterKind::Beefy => "beefy",
            AdapterKind::Morpho => "morpho",
            AdapterKind::PancakeSwap => "pancakeswap",
            AdapterKind::Uniswap => "uniswap",
            AdapterKind::Wombat => "wombat",
        }
    }
}

/// Venue market state, tagged by venue kind.
#[near(serializers = [json])]
#[derive(Clone, Debug)]
#[serde(tag = "venue", rename_all = "snake_case")]
pub enum VenueReport {
    Venus(VenusReport),
    Compound(CompoundReport),
    Aave(AaveReport),
    Beefy(BeefyReport),
    Morpho(MorphoReport),
    #[serde(rename = "pancakeswap")]
    PancakeSwap(PancakeReport),
    Uniswap(UniswapReport),
    Wombat(WombatReport),
}

impl VenueReport {
    pub fn kind(&self) -> AdapterKind {
        match self {
            VenueReport::Venus(_) => AdapterKind::Venus,
            VenueReport::Compound(_) => AdapterKind::Compound,
            VenueReport::Aave(_) => AdapterKind::Aave,
            VenueReport::Beefy(_) => AdapterKind::Beefy,
            VenueReport::Morpho(_) => AdapterKind::Morpho,
            VenueReport::PancakeSwap(_) => AdapterKind::PancakeSwap,
            VenueReport::Uniswap(_) => AdapterKind::Uniswap,
            VenueReport::Wombat(_) => AdapterKind::Wombat,
        }
    }
}

/// Keeper report for one strategy.
#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct StrategyReport {
    pub venue: VenueReport,
    /// Total value locked at the venue, in asset units.
    pub venue_tvl: U128,
    /// Whether the keeper could reach the venue.
    pub reachable: bool,
    /// New risk level, if the controller re-rated the venue.
    pub risk_level: Option<u8>,
}

/// The vault's position at a venue.
#[near(serializers = [borsh])]
#[derive(Clone, Debug)]
pub enum Venue {
    Venus(VenusMarket),
    Compound(CometMarket),
    Aave(AaveReserve),
    Beefy(BeefyVault),
    Morpho(MorphoVault),
    PancakeSwap(PancakeFarm),
    Uniswap(UniswapPosition),
    Wombat(WombatPool),
}

impl Venue {
    /// Opens an empty position at the venue described by `report`.
    pub fn from_report(report: &VenueReport, now_ns: u64) -> Result<Self, VenueError> {
        let mut venue = match report {
            VenueReport::Venus(_) => Venue::Venus(VenusMarket::default()),
            VenueReport::Compound(_) => Venue::Compound(CometMarket::default()),
            VenueReport::Aave(_) => Venue::Aave(AaveReserve::default()),
            VenueReport::Beefy(_) => Venue::Beefy(BeefyVault::default()),
            VenueReport::Morpho(_) => Venue::Morpho(MorphoVault::default()),
            VenueReport::PancakeSwap(_) => Venue::PancakeSwap(PancakeFarm::default()),
            VenueReport::Uniswap(_) => Venue::Uniswap(UniswapPosition::default()),
            VenueReport::Wombat(_) => Venue::Wombat(WombatPool::default()),
        };
        venue.source_mut().apply_report(report, now_ns)?;
        Ok(venue)
    }

    pub fn kind(&self) -> AdapterKind {
        match self {
            Venue::Venus(_) => AdapterKind::Venus,
            Venue::Compound(_) => AdapterKind::Compound,
            Venue::Aave(_) => AdapterKind::Aave,
            Venue::Beefy(_) => AdapterKind::Beefy,
            Venue::Morpho(_) => AdapterKind::Morpho,
            Venue::PancakeSwap(_) => AdapterKind::PancakeSwap,
            Venue::Uniswap(_) => AdapterKind::Uniswap,
            Venue::Wombat(_) => AdapterKind::Wombat,
        }
    }

    pub fn source(&self) -> &dyn YieldSource {
        match self {
            Venue::Venus(v) => v,
            Venue::Compound(v) => v,
            Venue::Aave(v) => v,
            Venue::Beefy(v) => v,
            Venue::Morpho(v) => v,
            Venue::PancakeSwap(v) => v,
            Venue::Uniswap(v) => v,
            Venue::Wombat(v) => v,
        }
    }

    pub fn source_mut(&mut self) -> &mut dyn YieldSource {
        match self {
            Venue::Venus(v) => v,
            Venue::Compound(v) => v,
            Venue::Aave(v) => v,
            Venue::Beefy(v) => v,
            Venue::Morpho(v) => v,
            Venue::PancakeSwap(v) => v,
            Venue::Uniswap(v) => v,
            Venue::Wombat(v) => v,
        }
    }
}

// ============================================================================
// Strategy adapter
// ============================================================================

/// Lifecycle of a registered strategy. Strategies are never removed.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterStatus {
    /// Registered and eligible as a rebalance destination.
    Standby,
    /// Receives new deposits.
    Current,
    /// Excluded from rebalancing until reactivated.
    Deactivated,
}

/// Outcome of a best-effort emergency withdrawal.
#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmergencyReport {
    pub strategy_id: StrategyId,
    pub recovered: U128,
    pub unrecovered: U128,
}

#[near(serializers = [borsh])]
pub struct StrategyAdapter {
    pub id: StrategyId,
    pub status: AdapterStatus,
    pub risk_level: u8,
    pub venue_tvl: u128,
    pub reachable: bool,
    pub last_report_ns: u64,
    venue: Venue,
    principal: IterableMap<AccountId, u128>,
    total_principal: u128,
    apy: ApyTracker,
}

impl StrategyAdapter {
    pub fn new(
        id: StrategyId,
        risk_level: u8,
        initial_apy_bps: i64,
        report: &StrategyReport,
        now_ns: u64,
    ) -> Result<Self, VaultError> {
        let venue =
            Venue::from_report(&report.venue, now_ns).map_err(|e| VaultError::adapter(&id, e))?;
        let apy = ApyTracker::new(initial_apy_bps, venue.source().unit_price(), now_ns);
        Ok(Self {
            principal: IterableMap::new(StorageKey::StrategyPrincipals {
                strategy_id: id.clone(),
            }),
            id,
            status: AdapterStatus::Standby,
            risk_level: report.risk_level.unwrap_or(risk_level),
            venue_tvl: report.venue_tvl.0,
            reachable: report.reachable,
            last_report_ns: now_ns,
            venue,
            total_principal: 0,
            apy,
        })
    }

    pub fn kind(&self) -> AdapterKind {
        self.venue.kind()
    }

    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    // ==================== Reads ====================

    /// Value of the position as of the last accrual.
    pub fn total_assets(&self) -> u128 {
        self.venue.source().position_value()
    }

    pub fn withdrawable(&self) -> u128 {
        self.venue.source().withdrawable().min(self.total_assets())
    }

    pub fn estimated_apy(&self) -> i64 {
        self.apy.apy_bps()
    }

    pub fn is_healthy(&self, now_ns: u64, max_report_age_ns: u64) -> bool {
        self.reachable
            && now_ns.saturating_sub(self.last_report_ns) <= max_report_age_ns
            && self.venue.source().is_operational()
    }

    pub fn principal_of(&self, account_id: &AccountId) -> u128 {
        self.principal.get(account_id).copied().unwrap_or(0)
    }

    pub fn total_principal(&self) -> u128 {
        self.total_principal
    }

    /// Share of the adapter's aggregate gain attributable to `account_id`.
    pub fn get_yield(&self, account_id: &AccountId) -> u128 {
        let principal = self.principal_of(account_id);
        if principal == 0 || self.total_principal == 0 {
            return 0;
        }
        let value = self.total_assets();
        if value <= self.total_principal {
            return 0;
        }
        mul_div(
            value - self.total_principal,
            principal,
            self.total_principal,
            Rounding::Down,
        )
    }

    pub fn principals(&self) -> Vec<(AccountId, u128)> {
        self.principal
            .iter()
            .map(|(account, amount)| (account.clone(), *amount))
            .collect()
    }

    // ==================== Fund movement ====================

    /// Accrues venue interest up to `now_ns` and returns the refreshed value.
    pub fn get_real_total_assets(&mut self, now_ns: u64) -> u128 {
        self.venue.source_mut().accrue(now_ns);
        let value = self.total_assets();
        env::log_str(&format!(
            "strategy_assets: strategy_id={} kind={} value={} principal={}",
            self.id,
            self.kind().as_str(),
            value,
            self.total_principal
        ));
        value
    }

    pub fn deposit(&mut self, account_id: &AccountId, amount: u128) -> Result<u128, VaultError> {
        let units = self.supply(amount)?;
        self.credit(account_id, amount)?;
        Ok(units)
    }

    /// Supplies `amount` without attributing principal to anyone.
    pub fn supply(&mut self, amount: u128) -> Result<u128, VaultError> {
        self.ensure_reachable()?;
        self.venue
            .source_mut()
            .supply(amount)
            .map_err(|e| VaultError::adapter(&self.id, e))
    }

    /// Value `amount` would add to the position, without supplying it.
    pub fn preview_supply(&self, amount: u128) -> Result<u128, VaultError> {
        self.ensure_reachable()?;
        let mut venue = self.venue.clone();
        let before = venue.source().position_value();
        venue
            .source_mut()
            .supply(amount)
            .map_err(|e| VaultError::adapter(&self.id, e))?;
        Ok(venue.source().position_value().saturating_sub(before))
    }

    /// Withdraws up to `amount` for `account_id`, releases `principal_released`
    /// and returns the assets received.
    pub fn withdraw(
        &mut self,
        account_id: &AccountId,
        amount: u128,
        principal_released: u128,
    ) -> Result<u128, VaultError> {
        self.ensure_principal(account_id, principal_released)?;
        let released = self.redeem(amount)?;
        self.debit(account_id, principal_released);
        Ok(released)
    }

    /// Withdraws `amount` of `account_id`'s attributable yield; principal is untouched.
    pub fn withdraw_yield(
        &mut self,
        account_id: &AccountId,
        amount: u128,
    ) -> Result<u128, VaultError> {
        let available = self.get_yield(account_id);
        if amount > available {
            return Err(VaultError::InsufficientYield {
                requested: amount,
                available,
            });
        }
        self.redeem(amount)
    }

    /// Releases principal without moving funds (payouts served from idle assets).
    pub fn release_principal(
        &mut self,
        account_id: &AccountId,
        amount: u128,
    ) -> Result<(), VaultError> {
        self.ensure_principal(account_id, amount)?;
        self.debit(account_id, amount);
        Ok(())
    }

    /// Re-attributes principal whose assets are parked outside the venue.
    pub fn restore_principal(
        &mut self,
        account_id: &AccountId,
        amount: u128,
    ) -> Result<(), VaultError> {
        self.credit(account_id, amount)
    }

    /// Closes the whole position. Principal records are left in place.
    pub fn withdraw_all(&mut self) -> Result<u128, VaultError> {
        self.ensure_reachable()?;
        if self.total_assets() == 0 {
            return Ok(0);
        }
        self.venue
            .source_mut()
            .redeem_all()
            .map_err(|e| VaultError::adapter(&self.id, e))
    }

    /// Supplies `amount` and credits the given principal records.
    pub fn deposit_all(
        &mut self,
        amount: u128,
        principals: &[(AccountId, u128)],
    ) -> Result<(), VaultError> {
        if amount > 0 {
            self.supply(amount)?;
        } else {
            self.ensure_reachable()?;
        }
        for (account_id, principal) in principals {
            self.credit(account_id, *principal)?;
        }
        Ok(())
    }

    /// Removes and returns every principal record.
    pub fn take_principals(&mut self) -> Vec<(AccountId, u128)> {
        let taken = self.principals();
        self.principal.clear();
        self.total_principal = 0;
        taken
    }

    /// Best-effort exit: recovers whatever the venue releases now.
    pub fn emergency_withdraw(&mut self) -> EmergencyReport {
        let expected = self.total_assets();
        let take = if self.reachable {
            self.venue.source().withdrawable().min(expected)
        } else {
            0
        };
        let result = if take == 0 {
            Ok(0)
        } else if take == expected {
            self.venue.source_mut().redeem_all()
        } else {
            self.venue.source_mut().redeem(take)
        };
        let recovered = match result {
            Ok(recovered) => recovered,
            Err(err) => {
                env::log_str(&format!(
                    "emergency_withdraw_failed: strategy_id={} reason={}",
                    self.id, err
                ));
                0
            }
        };
        EmergencyReport {
            strategy_id: self.id.clone(),
            recovered: U128(recovered),
            unrecovered: U128(expected.saturating_sub(recovered)),
        }
    }

    /// Applies a keeper report and folds the new unit price into the APY estimate.
    pub fn apply_report(&mut self, report: &StrategyReport, now_ns: u64) -> Result<(), VaultError> {
        self.venue
            .source_mut()
            .apply_report(&report.venue, now_ns)
            .map_err(|e| VaultError::adapter(&self.id, e))?;
        self.reachable = report.reachable;
        self.venue_tvl = report.venue_tvl.0;
        if let Some(risk_level) = report.risk_level {
            self.risk_level = risk_level;
        }
        self.last_report_ns = now_ns;
        self.apy.observe(self.venue.source().unit_price(), now_ns);
        Ok(())
    }

    pub fn view(&self, now_ns: u64, max_report_age_ns: u64) -> StrategyView {
        StrategyView {
            strategy_id: self.id.clone(),
            kind: self.kind(),
            status: self.status,
            risk_level: self.risk_level,
            total_assets: U128(self.total_assets()),
            total_principal: U128(self.total_principal),
            withdrawable: U128(self.withdrawable()),
            unit_price: U128(self.venue.source().unit_price()),
            estimated_apy_bps: self.estimated_apy(),
            venue_tvl: U128(self.venue_tvl),
            reachable: self.reachable,
            healthy: self.is_healthy(now_ns, max_report_age_ns),
            last_report_ns: U64(self.last_report_ns),
        }
    }

    // ==================== Internals ====================

    fn redeem(&mut self, amount: u128) -> Result<u128, VaultError> {
        self.ensure_reachable()?;
        let released = self
            .venue
            .source_mut()
            .redeem(amount)
            .map_err(|e| VaultError::adapter(&self.id, e))?;
        if released == 0 {
            return Err(VaultError::adapter(&self.id, VenueError::ZeroOutput));
        }
        Ok(released)
    }

    fn ensure_reachable(&self) -> Result<(), VaultError> {
        if self.reachable {
            Ok(())
        } else {
            Err(VaultError::adapter(&self.id, VenueError::Unreachable))
        }
    }

    fn ensure_principal(&self, account_id: &AccountId, amount: u128) -> Result<(), VaultError> {
        let available = self.principal_of(account_id);
        if amount > available {
            return Err(VaultError::InsufficientPrincipal {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    fn credit(&mut self, account_id: &AccountId, amount: u128) -> Result<(), VaultError> {
        if amount == 0 {
            return Ok(());
        }
        let total = self
            .total_principal
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        let balance = self
            .principal_of(account_id)
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        self.principal.insert(account_id.clone(), balance);
        self.total_principal = total;
        Ok(())
    }

    /// Caller guarantees `amount <= principal_of(account_id)`.
    fn debit(&mut self, account_id: &AccountId, amount: u128) {
        if amount == 0 {
            return;
        }
        let remaining = self.principal_of(account_id).saturating_sub(amount);
        if remaining == 0 {
            self.principal.remove(account_id);
        } else {
            self.principal.insert(account_id.clone(), remaining);
        }
        self.total_principal = self.total_principal.saturating_sub(amount);
    }
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyView {
    pub strategy_id: StrategyId,
    pub kind: AdapterKind,
    pub status: AdapterStatus,
    pub risk_level: u8,
    pub total_assets: U128,
    pub total_principal: U128,
    pub withdrawable: U128,
    pub unit_price: U128,
    pub estimated_apy_bps: i64,
    pub venue_tvl: U128,
    pub reachable: bool,
    pub healthy: bool,
    pub last_report_ns: U64,
}

/// Principal record of one account at one strategy.
#[derive(Serialize, JsonSchema, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct PrincipalView {
    pub account_id: String,
    pub principal: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::helpers::init_ctx;
    use crate::test_utils::reports::venus_report;

    fn alice() -> AccountId {
        "alice.test".parse().unwrap()
    }

    fn bob() -> AccountId {
        "bob.test".parse().unwrap()
    }

    fn adapter() -> StrategyAdapter {
        init_ctx("vault.test", 0);
        StrategyAdapter::new("venus".into(), 3, 500, &venus_report(EXP_SCALE, u128::MAX / 4), 0)
            .unwrap()
    }

    #[test]
    fn yield_is_pro_rata_of_aggregate_gain() {
        let mut a = adapter();
        a.deposit(&alice(), 300).unwrap();
        a.deposit(&bob(), 700).unwrap();
        // Exchange rate +10%: the position is worth 1_100.
        a.apply_report(&venus_report(EXP_SCALE + EXP_SCALE / 10, u128::MAX / 4), 1)
            .unwrap();

        assert_eq!(a.total_assets(), 1_100);
        assert_eq!(a.get_yield(&alice()), 30);
        assert_eq!(a.get_yield(&bob()), 70);
    }

    #[test]
    fn no_yield_without_gain() {
        let mut a = adapter();
        assert_eq!(a.get_yield(&alice()), 0);
        a.deposit(&alice(), 100).unwrap();
        assert_eq!(a.get_yield(&alice()), 0);
    }

    #[test]
    fn withdraw_checks_principal_before_redeeming() {
        let mut a = adapter();
        a.deposit(&alice(), 100).unwrap();
        let err = a.withdraw(&alice(), 50, 150).unwrap_err();
        assert!(matches!(err, VaultError::InsufficientPrincipal { .. }));
        assert_eq!(a.total_assets(), 100);
        assert_eq!(a.principal_of(&alice()), 100);

        a.withdraw(&alice(), 40, 40).unwrap();
        assert_eq!(a.total_assets(), 60);
        assert_eq!(a.principal_of(&alice()), 60);
        assert_eq!(a.total_principal(), 60);
    }

    #[test]
    fn withdraw_yield_leaves_principal() {
        let mut a = adapter();
        a.deposit(&alice(), 100).unwrap();
        a.apply_report(&venus_report(EXP_SCALE * 3 / 2, u128::MAX / 4), 1)
            .unwrap();
        assert_eq!(a.get_yield(&alice()), 50);

        assert!(matches!(
            a.withdraw_yield(&alice(), 51),
            Err(VaultError::InsufficientYield { .. })
        ));
        assert_eq!(a.withdraw_yield(&alice(), 50).unwrap(), 50);
        assert_eq!(a.total_assets(), 100);
        assert_eq!(a.principal_of(&alice()), 100);
        assert_eq!(a.get_yield(&alice()), 0);
    }

    #[test]
    fn withdrawal_below_one_unit_is_refused() {
        let mut a = adapter();
        a.deposit(&alice(), 100).unwrap();
        a.apply_report(&venus_report(EXP_SCALE * 3, u128::MAX / 4), 1)
            .unwrap();
        // One vToken is worth 3: two assets cannot be released.
        let err = a.withdraw(&alice(), 2, 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::AdapterUnavailable);
        assert_eq!(a.total_assets(), 300);
    }

    #[test]
    fn preview_supply_leaves_position_untouched() {
        let a = adapter();
        assert_eq!(a.preview_supply(250).unwrap(), 250);
        assert_eq!(a.total_assets(), 0);
    }

    #[test]
    fn unreachable_venue_fails_calls_and_health() {
        let mut a = adapter();
        let mut report = venus_report(EXP_SCALE, u128::MAX / 4);
        report.reachable = false;
        a.apply_report(&report, 1).unwrap();

        assert!(!a.is_healthy(1, 10));
        let err = a.deposit(&alice(), 10).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::AdapterUnavailable);
        assert_eq!(a.principal_of(&alice()), 0);
    }

    #[test]
    fn stale_report_makes_adapter_unhealthy() {
        let a = adapter();
        assert!(a.is_healthy(10, 10));
        assert!(!a.is_healthy(11, 10));
    }

    #[test]
    fn take_and_restore_principals() {
        let mut a = adapter();
        a.deposit(&alice(), 100).unwrap();
        a.deposit(&bob(), 50).unwrap();
        let value = a.withdraw_all().unwrap();
        let principals = a.take_principals();
        assert_eq!(value, 150);
        assert_eq!(a.total_principal(), 0);
        assert_eq!(a.principal_of(&alice()), 0);

        a.deposit_all(value, &principals).unwrap();
        assert_eq!(a.total_principal(), 150);
        assert_eq!(a.principal_of(&bob()), 50);
        assert_eq!(a.total_assets(), 150);
    }

    #[test]
    fn emergency_withdraw_reports_partial_recovery() {
        let mut a = adapter();
        a.deposit(&alice(), 1_000).unwrap();
        // Only 400 of cash left in the market.
        a.apply_report(&venus_report(EXP_SCALE, 400), 1).unwrap();

        let report = a.emergency_withdraw();
        assert_eq!(report.recovered, U128(400));
        assert_eq!(report.unrecovered, U128(600));
        assert_eq!(a.total_assets(), 600);
    }
}
