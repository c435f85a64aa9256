//! # Strategy Registry
//!
//! Maps strategy ids to their adapters. Exactly one adapter is current once
//! the first strategy is registered; it receives all new deposits. The
//! current pointer only moves inside a confirmed rebalance or escrow
//! resolution. Strategies are never removed, only deactivated.

use near_sdk::{env, near};

use crate::access::Role;
use crate::error::VaultError;
use crate::strategies::{
    AdapterStatus, PrincipalView, StrategyAdapter, StrategyReport, StrategyView,
};
use crate::{Contract, ContractExt};

pub type StrategyId = String;

impl Contract {
    pub(crate) fn adapter(&self, strategy_id: &str) -> Result<&StrategyAdapter, VaultError> {
        self.strategies
            .get(strategy_id)
            .ok_or_else(|| VaultError::UnknownStrategy(strategy_id.to_string()))
    }

    pub(crate) fn adapter_mut(
        &mut self,
        strategy_id: &str,
    ) -> Result<&mut StrategyAdapter, VaultError> {
        self.strategies
            .get_mut(strategy_id)
            .ok_or_else(|| VaultError::UnknownStrategy(strategy_id.to_string()))
    }

    pub(crate) fn current_id(&self) -> Result<StrategyId, VaultError> {
        self.current_strategy
            .clone()
            .ok_or(VaultError::NoCurrentStrategy)
    }

    pub(crate) fn is_adapter_healthy(&self, adapter: &StrategyAdapter) -> bool {
        adapter.is_healthy(env::block_timestamp(), self.config.max_report_age_ns.0)
    }
}

#[near]
impl Contract {
    /// Registers a strategy from its first keeper report.
    ///
    /// The venue kind is taken from the report. The first registered strategy
    /// becomes current; later ones start on standby.
    #[handle_result]
    pub fn register_strategy(
        &mut self,
        strategy_id: StrategyId,
        risk_level: u8,
        initial_apy_bps: i64,
        report: StrategyReport,
    ) -> Result<StrategyView, VaultError> {
        self.require_role(Role::Owner)?;
        if strategy_id.is_empty() {
            return Err(VaultError::UnknownStrategy(strategy_id));
        }
        if self.strategies.contains_key(&strategy_id) {
            return Err(VaultError::StrategyAlreadyRegistered(strategy_id));
        }
        let now = env::block_timestamp();
        let mut adapter =
            StrategyAdapter::new(strategy_id.clone(), risk_level, initial_apy_bps, &report, now)?;
        if self.current_strategy.is_none() {
            adapter.status = AdapterStatus::Current;
            self.current_strategy = Some(strategy_id.clone());
        }
        env::log_str(&format!(
            "register_strategy: strategy_id={} kind={} risk_level={} status={:?}",
            strategy_id,
            adapter.kind().as_str(),
            adapter.risk_level,
            adapter.status
        ));
        let view = adapter.view(now, self.config.max_report_age_ns.0);
        self.strategies.insert(strategy_id, adapter);
        Ok(view)
    }

    #[handle_result]
    pub fn deactivate_strategy(&mut self, strategy_id: StrategyId) -> Result<(), VaultError> {
        self.require_role(Role::Owner)?;
        if self.current_strategy.as_ref() == Some(&strategy_id) {
            return Err(VaultError::CannotDeactivateCurrent(strategy_id));
        }
        self.adapter_mut(&strategy_id)?.status = AdapterStatus::Deactivated;
        env::log_str(&format!("deactivate_strategy: strategy_id={strategy_id}"));
        Ok(())
    }

    #[handle_result]
    pub fn reactivate_strategy(&mut self, strategy_id: StrategyId) -> Result<(), VaultError> {
        self.require_role(Role::Owner)?;
        let adapter = self.adapter_mut(&strategy_id)?;
        if adapter.status == AdapterStatus::Deactivated {
            adapter.status = AdapterStatus::Standby;
            env::log_str(&format!("reactivate_strategy: strategy_id={strategy_id}"));
        }
        Ok(())
    }

    /// Keeper crank: pushes the venue's current market state.
    #[handle_result]
    pub fn report_strategy(
        &mut self,
        strategy_id: StrategyId,
        report: StrategyReport,
    ) -> Result<StrategyView, VaultError> {
        self.require_role(Role::StrategyController)?;
        let now = env::block_timestamp();
        let max_age = self.config.max_report_age_ns.0;
        let adapter = self.adapter_mut(&strategy_id)?;
        adapter.apply_report(&report, now)?;
        let view = adapter.view(now, max_age);
        env::log_str(&format!(
            "report_strategy: strategy_id={} value={} apy_bps={} healthy={}",
            strategy_id, view.total_assets.0, view.estimated_apy_bps, view.healthy
        ));
        Ok(view)
    }

    /// Accrues venue interest up to the current block and returns the position value.
    #[handle_result]
    pub fn sync_strategy_assets(
        &mut self,
        strategy_id: StrategyId,
    ) -> Result<near_sdk::json_types::U128, VaultError> {
        self.require_role(Role::StrategyController)?;
        let now = env::block_timestamp();
        let value = self.adapter_mut(&strategy_id)?.get_real_total_assets(now);
        Ok(near_sdk::json_types::U128(value))
    }

    // ==================== View Methods ====================

    pub fn get_strategy(&self, strategy_id: StrategyId) -> Option<StrategyView> {
        let now = env::block_timestamp();
        self.strategies
            .get(&strategy_id)
            .map(|adapter| adapter.view(now, self.config.max_report_age_ns.0))
    }

    pub fn get_strategies(&self) -> Vec<StrategyView> {
        let now = env::block_timestamp();
        self.strategies
            .values()
            .map(|adapter| adapter.view(now, self.config.max_report_age_ns.0))
            .collect()
    }

    pub fn get_current_strategy(&self) -> Option<StrategyId> {
        self.current_strategy.clone()
    }

    /// Principal records held by `strategy_id`.
    pub fn get_principals(&self, strategy_id: StrategyId) -> Vec<PrincipalView> {
        self.strategies
            .get(&strategy_id)
            .map(|adapter| {
                adapter
                    .principals()
                    .into_iter()
                    .map(|(account_id, principal)| PrincipalView {
                        account_id: account_id.to_string(),
                        principal: principal.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
