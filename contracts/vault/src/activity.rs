//! # Activity Log
//!
//! Append-only record of every state transition the vault commits. Entries are
//! written in the same call as the transition they describe and emitted once
//! as an `EVENT_JSON` line. Per-account entries are indexed for lookup.

use near_sdk::json_types::{U128, U64};
use near_sdk::{env, near, AccountId};

use crate::rebalance::RebalanceRecord;
use crate::registry::StrategyId;
use crate::vault_standards::events::emit_activity;
use crate::{Contract, ContractExt};

/// Largest page returned by the activity views.
pub const MAX_PAGE: u32 = 100;

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum VaultActivity {
    Deposit {
        account_id: AccountId,
        strategy_id: StrategyId,
        assets: U128,
        shares: U128,
    },
    Withdraw {
        account_id: AccountId,
        assets: U128,
        shares: U128,
    },
    YieldWithdraw {
        account_id: AccountId,
        strategy_id: StrategyId,
        assets: U128,
        shares: U128,
    },
    /// A payout transfer failed; shares were re-minted and the assets kept.
    PayoutReverted {
        account_id: AccountId,
        assets: U128,
        shares: U128,
    },
    Rebalance(RebalanceRecord),
    RebalanceEscrowed {
        from: StrategyId,
        to: StrategyId,
        amount: U128,
    },
    EscrowResolved {
        strategy_id: StrategyId,
        amount: U128,
    },
    EmergencyWithdraw {
        strategy_id: StrategyId,
        recovered: U128,
        unrecovered: U128,
    },
    Reinvest {
        strategy_id: StrategyId,
        amount: U128,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },
}

impl VaultActivity {
    /// The share holder this activity concerns, if any.
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            VaultActivity::Deposit { account_id, .. }
            | VaultActivity::Withdraw { account_id, .. }
            | VaultActivity::YieldWithdraw { account_id, .. }
            | VaultActivity::PayoutReverted { account_id, .. } => Some(account_id),
            _ => None,
        }
    }
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    pub seq: u64,
    pub timestamp: U64,
    pub activity: VaultActivity,
}

impl Contract {
    /// Appends `activity` to the log and emits its event.
    pub(crate) fn record_activity(&mut self, activity: VaultActivity) {
        let seq = self.activity_log.len() as u64;
        if let Some(account) = activity.account().cloned() {
            match self.account_activity.get_mut(&account) {
                Some(indices) => indices.push(seq),
                None => {
                    self.account_activity.insert(account, vec![seq]);
                }
            }
        }
        emit_activity(&activity);
        self.activity_log.push(ActivityEntry {
            seq,
            timestamp: U64(env::block_timestamp()),
            activity,
        });
    }
}

#[near]
impl Contract {
    // ==================== View Methods ====================

    pub fn get_activity(&self, from_index: Option<u64>, limit: Option<u32>) -> Vec<ActivityEntry> {
        let from = from_index.unwrap_or(0);
        let limit = limit.unwrap_or(MAX_PAGE).min(MAX_PAGE) as u64;
        let len = self.activity_log.len() as u64;
        (from..len.min(from.saturating_add(limit)))
            .filter_map(|seq| self.activity_log.get(seq as u32).cloned())
            .collect()
    }

    pub fn get_account_activity(
        &self,
        account_id: AccountId,
        from_index: Option<u64>,
        limit: Option<u32>,
    ) -> Vec<ActivityEntry> {
        let Some(indices) = self.account_activity.get(&account_id) else {
            return vec![];
        };
        indices
            .iter()
            .skip(from_index.unwrap_or(0) as usize)
            .take(limit.unwrap_or(MAX_PAGE).min(MAX_PAGE) as usize)
            .filter_map(|seq| self.activity_log.get(*seq as u32).cloned())
            .collect()
    }

    pub fn get_activity_count(&self) -> u64 {
        self.activity_log.len() as u64
    }
}
