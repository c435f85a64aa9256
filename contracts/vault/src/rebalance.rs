//! # Rebalance Coordinator
//!
//! Moves the pooled position from the current strategy to a better one.
//!
//! ```text
//! Idle -> Analyzing -> Executing -> Idle
//!                          |-> Aborted -> Idle     (destination failed, source restored)
//!                          |-> Escrowed            (restore failed too)
//! ```
//!
//! Every gate (role, pause, cooldown, destination health, score improvement,
//! slippage) is checked before any fund moves. The current pointer is swapped
//! only after the destination accepted the funds. An escrow blocks deposits,
//! withdrawals and further rebalances until the owner resolves it.

use near_sdk::json_types::{I128, U128, U64};
use near_sdk::{env, near, AccountId};

use crate::access::Role;
use crate::activity::VaultActivity;
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::registry::StrategyId;
use crate::strategies::{AdapterStatus, StrategyAdapter};
use crate::vault_standards::mul_div::{mul_div, Rounding, BPS_DENOMINATOR};
use crate::{Contract, ContractExt};

/// Largest page returned by `get_rebalance_history`.
pub const MAX_HISTORY_PAGE: u32 = 100;

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RebalancePhase {
    #[default]
    Idle,
    Analyzing,
    Executing,
    Aborted,
    Escrowed,
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebalanceRecord {
    pub from: StrategyId,
    pub to: StrategyId,
    pub amount_moved: U128,
    pub timestamp: U64,
    pub reason_score: I128,
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrincipalEntry {
    pub account_id: AccountId,
    pub amount: U128,
}

/// Funds of an interrupted rebalance, held by the vault.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebalanceEscrow {
    pub from: StrategyId,
    pub to: StrategyId,
    pub amount: U128,
    pub principals: Vec<PrincipalEntry>,
    pub created_at: U64,
}

impl RebalanceEscrow {
    fn principal_pairs(&self) -> Vec<(AccountId, u128)> {
        self.principals
            .iter()
            .map(|entry| (entry.account_id.clone(), entry.amount.0))
            .collect()
    }
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RebalanceOutcome {
    Completed { record: RebalanceRecord },
    /// The destination refused the funds; they are back at the source.
    RolledBack { reason: String },
    /// Neither side accepted the funds; see `get_rebalance_escrow`.
    Escrowed { amount: U128 },
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateScore {
    pub strategy_id: StrategyId,
    pub score: I128,
    pub healthy: bool,
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebalanceAnalysis {
    pub current: Option<CandidateScore>,
    pub candidates: Vec<CandidateScore>,
    /// Best healthy candidate that clears the improvement gate.
    pub recommended: Option<StrategyId>,
    pub cooldown_remaining_ns: U64,
}

/// `apy * (risk_ceiling - risk) * tvl_factor`, with `tvl_factor` in percent.
pub fn score(apy_bps: i64, risk_level: u8, venue_tvl: u128, config: &VaultConfig) -> i128 {
    let headroom = config.risk_ceiling.saturating_sub(risk_level) as i128;
    let tvl_factor = if venue_tvl >= config.tvl_bonus_threshold.0 {
        100 + config.tvl_bonus_pct as i128
    } else {
        100
    };
    apy_bps as i128 * headroom * tvl_factor
}

/// Whether `candidate` beats `current` by at least `min_improvement_pct` percent.
pub fn meets_improvement(current: i128, candidate: i128, min_improvement_pct: u16) -> bool {
    if current <= 0 {
        return candidate > 0 && candidate > current;
    }
    candidate.saturating_mul(100) >= current.saturating_mul(100 + min_improvement_pct as i128)
}

/// Highest-scoring healthy candidate; ties go to the earlier registration.
fn best_candidate(candidates: &[CandidateScore]) -> Option<&CandidateScore> {
    candidates
        .iter()
        .filter(|c| c.healthy)
        .fold(None, |best: Option<&CandidateScore>, c| match best {
            Some(b) if b.score.0 >= c.score.0 => Some(b),
            _ => Some(c),
        })
}

impl Contract {
    pub(crate) fn require_no_escrow(&self) -> Result<(), VaultError> {
        if self.rebalance_escrow.is_some() {
            return Err(VaultError::RebalanceInProgress);
        }
        Ok(())
    }

    fn adapter_score(&self, adapter: &StrategyAdapter) -> i128 {
        score(
            adapter.estimated_apy(),
            adapter.risk_level,
            adapter.venue_tvl,
            &self.config,
        )
    }

    /// Score used by the improvement gate; an unhealthy adapter always loses.
    fn effective_score(&self, adapter: &StrategyAdapter) -> i128 {
        if self.is_adapter_healthy(adapter) {
            self.adapter_score(adapter)
        } else {
            i128::MIN
        }
    }

    fn cooldown_remaining(&self, now: u64) -> u64 {
        match self.last_rebalance_at {
            Some(at) => at
                .saturating_add(self.config.rebalance_cooldown_ns.0)
                .saturating_sub(now),
            None => 0,
        }
    }

    fn require_cooldown_elapsed(&self) -> Result<(), VaultError> {
        let remaining_ns = self.cooldown_remaining(env::block_timestamp());
        if remaining_ns > 0 {
            return Err(VaultError::CooldownActive { remaining_ns });
        }
        Ok(())
    }

    fn transition(&mut self, next: RebalancePhase) {
        env::log_str(&format!(
            "rebalance_phase: from={:?} to={:?}",
            self.rebalance_phase, next
        ));
        self.rebalance_phase = next;
    }

    fn candidate(&self, adapter: &StrategyAdapter) -> CandidateScore {
        CandidateScore {
            strategy_id: adapter.id.clone(),
            score: I128(self.adapter_score(adapter)),
            healthy: self.is_adapter_healthy(adapter),
        }
    }

    pub(crate) fn analyze_candidates(&self) -> RebalanceAnalysis {
        let current = self
            .current_strategy
            .as_ref()
            .and_then(|id| self.strategies.get(id));
        let candidates: Vec<CandidateScore> = self
            .strategies
            .values()
            .filter(|adapter| {
                adapter.status == AdapterStatus::Standby
                    && Some(&adapter.id) != self.current_strategy.as_ref()
            })
            .map(|adapter| self.candidate(adapter))
            .collect();

        let best = best_candidate(&candidates);
        let current_effective = current.map(|a| self.effective_score(a));
        let recommended = best
            .filter(|b| match current_effective {
                None => true,
                Some(i128::MIN) => true,
                Some(current) => {
                    meets_improvement(current, b.score.0, self.config.min_improvement_pct)
                }
            })
            .map(|b| b.strategy_id.clone());

        RebalanceAnalysis {
            current: current.map(|a| self.candidate(a)),
            candidates,
            recommended,
            cooldown_remaining_ns: U64(self.cooldown_remaining(env::block_timestamp())),
        }
    }

    /// Validates the destination and the improvement gate; returns the destination score.
    fn check_destination(&self, from: &str, to: &str) -> Result<i128, VaultError> {
        let destination = self.adapter(to)?;
        if destination.status == AdapterStatus::Deactivated {
            return Err(VaultError::StrategyDeactivated(to.to_string()));
        }
        if !self.is_adapter_healthy(destination) {
            return Err(VaultError::DestinationUnhealthy(to.to_string()));
        }
        let candidate_score = self.adapter_score(destination);
        let source = self.adapter(from)?;
        if self.is_adapter_healthy(source) {
            let current_score = self.adapter_score(source);
            if !meets_improvement(current_score, candidate_score, self.config.min_improvement_pct)
            {
                return Err(VaultError::InsufficientImprovement {
                    current_score,
                    candidate_score,
                });
            }
        }
        Ok(candidate_score)
    }

    /// Moves the source position and idle funds to `to`, restoring or escrowing on failure.
    fn execute_rebalance(
        &mut self,
        from: StrategyId,
        to: StrategyId,
        reason_score: i128,
    ) -> Result<RebalanceOutcome, VaultError> {
        self.transition(RebalancePhase::Executing);
        let now = env::block_timestamp();

        let withdrawn = self.adapter_mut(&from)?.withdraw_all();
        let withdrawn = match withdrawn {
            Ok(withdrawn) => withdrawn,
            Err(err) => {
                self.transition(RebalancePhase::Aborted);
                self.transition(RebalancePhase::Idle);
                return Err(err);
            }
        };
        let amount = withdrawn
            .checked_add(self.idle_assets)
            .ok_or(VaultError::MathOverflow)?;
        let principals = self.adapter_mut(&from)?.take_principals();
        self.idle_assets = 0;

        let placed = self.adapter_mut(&to)?.deposit_all(amount, &principals);
        if let Err(err) = placed {
            env::log_str(&format!(
                "rebalance_destination_failed: to={to} amount={amount} reason={err}"
            ));
            let restored = self.adapter_mut(&from)?.deposit_all(amount, &principals);
            return match restored {
                Ok(()) => {
                    self.transition(RebalancePhase::Aborted);
                    self.transition(RebalancePhase::Idle);
                    Ok(RebalanceOutcome::RolledBack {
                        reason: err.to_string(),
                    })
                }
                Err(restore_err) => {
                    env::log_str(&format!(
                        "rebalance_restore_failed: from={from} amount={amount} reason={restore_err}"
                    ));
                    self.rebalance_escrow = Some(RebalanceEscrow {
                        from: from.clone(),
                        to: to.clone(),
                        amount: U128(amount),
                        principals: principals
                            .into_iter()
                            .map(|(account_id, amount)| PrincipalEntry {
                                account_id,
                                amount: U128(amount),
                            })
                            .collect(),
                        created_at: U64(now),
                    });
                    self.transition(RebalancePhase::Escrowed);
                    self.record_activity(VaultActivity::RebalanceEscrowed {
                        from,
                        to,
                        amount: U128(amount),
                    });
                    Ok(RebalanceOutcome::Escrowed {
                        amount: U128(amount),
                    })
                }
            };
        }

        let record = self.commit_switch(from, to, amount, reason_score, now)?;
        self.transition(RebalancePhase::Idle);
        Ok(RebalanceOutcome::Completed { record })
    }

    /// Swaps the current pointer after the destination confirmed its deposit.
    fn commit_switch(
        &mut self,
        from: StrategyId,
        to: StrategyId,
        amount: u128,
        reason_score: i128,
        now: u64,
    ) -> Result<RebalanceRecord, VaultError> {
        if self.current_strategy.as_ref() != Some(&to) {
            self.adapter_mut(&from)?.status = AdapterStatus::Standby;
            self.adapter_mut(&to)?.status = AdapterStatus::Current;
            self.current_strategy = Some(to.clone());
        }
        self.last_rebalance_at = Some(now);
        let record = RebalanceRecord {
            from,
            to,
            amount_moved: U128(amount),
            timestamp: U64(now),
            reason_score: I128(reason_score),
        };
        self.rebalance_history.push(record.clone());
        self.record_activity(VaultActivity::Rebalance(record.clone()));
        Ok(record)
    }
}

#[near]
impl Contract {
    /// Moves all funds from the current strategy `from` to `to`.
    ///
    /// `amount` is the amount the caller expects to move; the source's
    /// realizable value may fall short of it by at most `max_slippage_bps`.
    #[handle_result]
    pub fn rebalance(
        &mut self,
        from: StrategyId,
        to: StrategyId,
        amount: U128,
    ) -> Result<RebalanceOutcome, VaultError> {
        self.require_role(Role::StrategyController)?;
        self.require_not_paused()?;
        self.require_no_escrow()?;
        if self.current_id()? != from {
            return Err(VaultError::NotCurrentStrategy(from));
        }
        if from == to {
            return Err(VaultError::SameStrategy);
        }
        self.require_cooldown_elapsed()?;
        let reason_score = self.check_destination(&from, &to)?;

        let available = self
            .adapter(&from)?
            .withdrawable()
            .saturating_add(self.idle_assets);
        let keep_bps = BPS_DENOMINATOR - self.config.max_slippage_bps as u128;
        let floor = mul_div(amount.0, keep_bps, BPS_DENOMINATOR, Rounding::Up);
        if available < floor {
            return Err(VaultError::SlippageExceeded {
                expected: amount.0,
                available,
            });
        }

        self.transition(RebalancePhase::Analyzing);
        self.execute_rebalance(from, to, reason_score)
    }

    /// Rebalances into the best healthy candidate if it clears the improvement gate.
    #[handle_result]
    pub fn auto_rebalance(&mut self) -> Result<RebalanceOutcome, VaultError> {
        self.require_role(Role::StrategyController)?;
        self.require_not_paused()?;
        self.require_no_escrow()?;
        let from = self.current_id()?;
        self.require_cooldown_elapsed()?;

        let analysis = self.analyze_candidates();
        let Some(best) = best_candidate(&analysis.candidates) else {
            return Err(VaultError::NoEligibleCandidate);
        };
        let to = best.strategy_id.clone();
        let reason_score = self.check_destination(&from, &to)?;

        self.transition(RebalancePhase::Analyzing);
        self.execute_rebalance(from, to, reason_score)
    }

    /// Places escrowed funds into `destination`, or back into the source by default.
    #[handle_result]
    pub fn resolve_escrow(
        &mut self,
        destination: Option<StrategyId>,
    ) -> Result<StrategyId, VaultError> {
        self.require_role(Role::Owner)?;
        let escrow = self.rebalance_escrow.clone().ok_or(VaultError::NoEscrow)?;
        let destination = destination.unwrap_or_else(|| escrow.from.clone());

        let adapter = self.adapter(&destination)?;
        if adapter.status == AdapterStatus::Deactivated {
            return Err(VaultError::StrategyDeactivated(destination));
        }
        if destination != escrow.from && !self.is_adapter_healthy(adapter) {
            return Err(VaultError::DestinationUnhealthy(destination));
        }
        let reason_score = self.adapter_score(adapter);

        self.adapter_mut(&destination)?
            .deposit_all(escrow.amount.0, &escrow.principal_pairs())?;
        self.rebalance_escrow = None;

        if destination != escrow.from {
            self.commit_switch(
                escrow.from.clone(),
                destination.clone(),
                escrow.amount.0,
                reason_score,
                env::block_timestamp(),
            )?;
        }
        self.record_activity(VaultActivity::EscrowResolved {
            strategy_id: destination.clone(),
            amount: escrow.amount,
        });
        self.transition(RebalancePhase::Idle);
        Ok(destination)
    }

    // ==================== View Methods ====================

    pub fn analyze(&self) -> RebalanceAnalysis {
        self.analyze_candidates()
    }

    pub fn get_rebalance_history(
        &self,
        from_index: Option<u32>,
        limit: Option<u32>,
    ) -> Vec<RebalanceRecord> {
        let from = from_index.unwrap_or(0);
        let limit = limit.unwrap_or(MAX_HISTORY_PAGE).min(MAX_HISTORY_PAGE);
        (from..self.rebalance_history.len().min(from.saturating_add(limit)))
            .filter_map(|index| self.rebalance_history.get(index).cloned())
            .collect()
    }

    pub fn get_rebalance_phase(&self) -> RebalancePhase {
        self.rebalance_phase
    }

    pub fn get_rebalance_escrow(&self) -> Option<RebalanceEscrow> {
        self.rebalance_escrow.clone()
    }
}
