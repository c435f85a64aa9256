//! # Strategy Vault Contract
//!
//! A NEAR smart contract that pools deposits of one fungible token and places
//! them in a single external yield strategy at a time. The contract provides:
//!
//! - **Vault Operations**: NEP-141 shares minted on deposit, burned on withdrawal
//! - **Principal Tracking**: per-account principal, so yield can be withdrawn on its own
//! - **Strategy Adapters**: lending, LP and vault venues behind one interface
//! - **Rebalancing**: score-gated migration of the pooled position with rollback
//! - **Controls**: owner and strategy-controller roles, pause, emergency withdrawal
//!
//! ## Architecture
//!
//! The contract is organized into several modules:
//! - [`vault`]: Deposits, share and yield withdrawals, payout resolution
//! - [`registry`]: Strategy registration, keeper reports and lookups
//! - [`strategies`]: Venue adapters and principal accounting
//! - [`rebalance`]: Candidate scoring, rebalance execution and escrow
//! - [`access`]: Roles and authorization
//! - [`config`]: Tunable thresholds
//! - [`activity`]: Append-only activity log and event emission
//! - [`vault_standards`]: Vault core interface, share math and events

use near_sdk::{
    borsh::{BorshDeserialize, BorshSerialize},
    env, near,
    store::{IterableMap, LookupMap, Vector},
    AccountId, BorshStorageKey, PanicOnDefault,
};

use near_contract_standards::fungible_token::{
    core_impl::FungibleToken, metadata::FungibleTokenMetadata,
};

pub mod access;
pub mod activity;
pub mod config;
pub mod error;
pub mod rebalance;
pub mod registry;
pub mod strategies;
pub mod vault;
pub mod vault_standards;

#[cfg(test)]
pub mod test_utils;

use access::{AccessControl, Role};
use activity::{ActivityEntry, VaultActivity};
use config::VaultConfig;
use error::VaultError;
use rebalance::{RebalanceEscrow, RebalancePhase, RebalanceRecord};
use registry::StrategyId;
use strategies::{EmergencyReport, StrategyAdapter};

/// Storage keys for NEAR SDK collections.
#[derive(BorshSerialize, BorshDeserialize, BorshStorageKey)]
#[borsh(crate = "near_sdk::borsh")]
pub enum StorageKey {
    /// Storage prefix for the NEP-141 fungible token (vault shares).
    FungibleToken,
    /// Storage prefix for strategy adapters by id.
    Strategies,
    /// Storage prefix for one strategy's principal records.
    StrategyPrincipals { strategy_id: StrategyId },
    /// Storage prefix for completed rebalances.
    RebalanceHistory,
    /// Storage prefix for the activity log.
    ActivityLog,
    /// Storage prefix for activity indices by account.
    AccountActivity,
}

/// Main contract state.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    /// Owner and strategy controller.
    pub access: AccessControl,
    /// Whether deposits, withdrawals and rebalances are blocked.
    pub is_paused: bool,
    pub config: VaultConfig,

    // Vault State
    /// NEP-141 fungible token representing vault shares.
    pub token: FungibleToken,
    /// Metadata for the vault share token.
    pub metadata: FungibleTokenMetadata,
    /// Account ID of the underlying asset token (NEP-141).
    pub asset: AccountId,
    /// Assets held by the vault itself, outside any strategy.
    pub idle_assets: u128,

    // Strategies
    pub strategies: IterableMap<StrategyId, StrategyAdapter>,
    /// Strategy receiving deposits. Set by the first registration.
    pub current_strategy: Option<StrategyId>,
    pub rebalance_phase: RebalancePhase,
    /// Funds of a rebalance that neither side accepted.
    pub rebalance_escrow: Option<RebalanceEscrow>,
    /// Block timestamp of the last completed rebalance, in nanoseconds.
    pub last_rebalance_at: Option<u64>,
    pub rebalance_history: Vector<RebalanceRecord>,

    // Activity
    pub activity_log: Vector<ActivityEntry>,
    pub account_activity: LookupMap<AccountId, Vec<u64>>,
}

#[near]
impl Contract {
    /// Initializes the vault.
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Account holding the owner role
    /// * `asset` - Account ID of the underlying NEP-141 asset token
    /// * `metadata` - Fungible token metadata for vault shares
    /// * `strategy_controller` - Keeper allowed to report and rebalance
    /// * `config` - Thresholds; defaults when omitted
    ///
    /// # Panics
    ///
    /// Panics if `config` is out of range.
    #[init]
    #[private]
    pub fn init(
        owner_id: AccountId,
        asset: AccountId,
        metadata: FungibleTokenMetadata,
        strategy_controller: Option<AccountId>,
        config: Option<VaultConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        if let Err(err) = config.validate() {
            near_sdk::FunctionError::panic(&err);
        }
        Self {
            access: AccessControl::new(owner_id, strategy_controller),
            is_paused: false,
            config,
            token: FungibleToken::new(StorageKey::FungibleToken),
            metadata,
            asset,
            idle_assets: 0,
            strategies: IterableMap::new(StorageKey::Strategies),
            current_strategy: None,
            rebalance_phase: RebalancePhase::Idle,
            rebalance_escrow: None,
            last_rebalance_at: None,
            rebalance_history: Vector::new(StorageKey::RebalanceHistory),
            activity_log: Vector::new(StorageKey::ActivityLog),
            account_activity: LookupMap::new(StorageKey::AccountActivity),
        }
    }

    pub(crate) fn require_not_paused(&self) -> Result<(), VaultError> {
        if self.is_paused {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    /// Blocks deposits, withdrawals and rebalances. Views stay available.
    #[handle_result]
    pub fn pause(&mut self) -> Result<(), VaultError> {
        let by = self.require_role(Role::Owner)?;
        self.require_not_paused()?;
        self.is_paused = true;
        self.record_activity(VaultActivity::Paused { by });
        Ok(())
    }

    #[handle_result]
    pub fn unpause(&mut self) -> Result<(), VaultError> {
        let by = self.require_role(Role::Owner)?;
        if !self.is_paused {
            return Err(VaultError::NotPaused);
        }
        self.is_paused = false;
        self.record_activity(VaultActivity::Unpaused { by });
        Ok(())
    }

    /// Pulls whatever a strategy releases right now into idle funds.
    ///
    /// Defaults to the current strategy. Allowed while paused. Principal
    /// records stay with the strategy; the unrecovered part keeps counting as
    /// its position.
    #[handle_result]
    pub fn emergency_withdraw(
        &mut self,
        strategy_id: Option<StrategyId>,
    ) -> Result<EmergencyReport, VaultError> {
        self.require_role(Role::Owner)?;
        let strategy_id = match strategy_id {
            Some(strategy_id) => strategy_id,
            None => self.current_id()?,
        };
        let report = self.adapter_mut(&strategy_id)?.emergency_withdraw();
        self.idle_assets = self.idle_assets.saturating_add(report.recovered.0);
        env::log_str(&format!(
            "emergency_withdraw: strategy_id={} recovered={} unrecovered={}",
            report.strategy_id, report.recovered.0, report.unrecovered.0
        ));
        self.record_activity(VaultActivity::EmergencyWithdraw {
            strategy_id,
            recovered: report.recovered,
            unrecovered: report.unrecovered,
        });
        Ok(report)
    }

    // ==================== View Methods ====================

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }
}
