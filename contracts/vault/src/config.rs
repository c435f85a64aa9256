//! # Vault Configuration
//!
//! Tunables of the rebalance coordinator and adapter health checks. Passed to
//! `init` (or defaulted) and replaceable by the owner through `update_config`.

use near_sdk::json_types::{U128, U64};
use near_sdk::{env, near};

use crate::access::Role;
use crate::error::VaultError;
use crate::{Contract, ContractExt};

pub const NS_PER_SECOND: u64 = 1_000_000_000;
pub const NS_PER_HOUR: u64 = 3_600 * NS_PER_SECOND;
pub const NS_PER_DAY: u64 = 24 * NS_PER_HOUR;
pub const NS_PER_YEAR: u64 = 365 * NS_PER_DAY;

/// Upper bound for `risk_ceiling`; risk levels are small ordinal scores.
pub const MAX_RISK_CEILING: u8 = 100;

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultConfig {
    /// Minimum time between two successful rebalances.
    pub rebalance_cooldown_ns: U64,
    /// Relative score improvement a destination needs over the current adapter.
    pub min_improvement_pct: u16,
    /// Allowed shortfall of the moved amount against the expected amount.
    pub max_slippage_bps: u16,
    /// Adapters whose last keeper report is older than this are unhealthy.
    pub max_report_age_ns: U64,
    /// Risk levels at or above the ceiling score zero.
    pub risk_ceiling: u8,
    /// Venue TVL (in asset units) from which the TVL bonus applies.
    pub tvl_bonus_threshold: U128,
    /// Score bonus, in percent, for venues above the TVL threshold.
    pub tvl_bonus_pct: u16,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            rebalance_cooldown_ns: U64(6 * NS_PER_HOUR),
            min_improvement_pct: 20,
            max_slippage_bps: 50,
            max_report_age_ns: U64(NS_PER_DAY),
            risk_ceiling: 10,
            tvl_bonus_threshold: U128(10_000_000_000_000),
            tvl_bonus_pct: 10,
        }
    }
}

impl VaultConfig {
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.risk_ceiling == 0 || self.risk_ceiling > MAX_RISK_CEILING {
            return Err(VaultError::InvalidConfig("risk_ceiling"));
        }
        if self.max_slippage_bps as u128 > crate::vault_standards::mul_div::BPS_DENOMINATOR {
            return Err(VaultError::InvalidConfig("max_slippage_bps"));
        }
        if self.max_report_age_ns.0 == 0 {
            return Err(VaultError::InvalidConfig("max_report_age_ns"));
        }
        if self.min_improvement_pct > 1_000 {
            return Err(VaultError::InvalidConfig("min_improvement_pct"));
        }
        if self.tvl_bonus_pct > 1_000 {
            return Err(VaultError::InvalidConfig("tvl_bonus_pct"));
        }
        Ok(())
    }
}

#[near]
impl Contract {
    #[handle_result]
    pub fn update_config(&mut self, config: VaultConfig) -> Result<(), VaultError> {
        self.require_role(Role::Owner)?;
        config.validate()?;
        env::log_str(&format!(
            "update_config: cooldown_ns={} min_improvement_pct={} max_slippage_bps={} max_report_age_ns={} risk_ceiling={}",
            config.rebalance_cooldown_ns.0,
            config.min_improvement_pct,
            config.max_slippage_bps,
            config.max_report_age_ns.0,
            config.risk_ceiling
        ));
        self.config = config;
        Ok(())
    }

    pub fn get_config(&self) -> VaultConfig {
        self.config.clone()
    }
}
