//! # Vault Ledger
//!
//! Share accounting over the current strategy.
//!
//! - Deposits arrive as `ft_transfer_call` from the asset contract. Shares are
//!   minted only after the current strategy accepted the funds; on any error
//!   the whole amount is refunded.
//! - `withdraw_shares` burns shares for their pro-rata value, paid from idle
//!   funds first and then from the strategy.
//! - `withdraw_yield` pays out the caller's attributable gain and burns the
//!   shares it was worth, leaving principal untouched.
//!
//! Payouts are `ft_transfer`s resolved by `resolve_withdraw`, which re-mints
//! the shares and keeps the assets if the transfer failed.

use near_contract_standards::fungible_token::events::{FtBurn, FtMint};
use near_contract_standards::fungible_token::metadata::{
    FungibleTokenMetadata, FungibleTokenMetadataProvider,
};
use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::json_types::{U128, U64};
use near_sdk::serde::Deserialize;
use near_sdk::{
    assert_one_yocto, env, near, AccountId, Promise, PromiseOrValue, PromiseResult,
};

use crate::access::Role;
use crate::activity::VaultActivity;
use crate::error::VaultError;
use crate::rebalance::{PrincipalEntry, RebalanceEscrow, RebalancePhase};
use crate::registry::StrategyId;
use crate::vault_standards::internal::{Payout, PayoutKind};
use crate::vault_standards::mul_div::{checked_mul_div, mul_div, Rounding};
use crate::vault_standards::VaultCore;
use crate::{Contract, ContractExt};

/// Optional `msg` of a deposit `ft_transfer_call`. An empty message is a plain deposit.
#[derive(Deserialize, Default)]
#[serde(crate = "near_sdk::serde")]
pub struct DepositMessage {
    pub receiver_id: Option<AccountId>,
    pub min_shares: Option<U128>,
    pub memo: Option<String>,
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultState {
    pub asset: AccountId,
    pub total_assets: U128,
    pub total_shares: U128,
    pub idle_assets: U128,
    pub share_price: U128,
    pub current_strategy: Option<StrategyId>,
    pub strategy_count: u32,
    pub is_paused: bool,
    pub rebalance_phase: RebalancePhase,
    pub rebalance_escrow: Option<RebalanceEscrow>,
    pub last_rebalance_at: Option<U64>,
}

impl Contract {
    /// Mints shares for `amount` deposited by `sender_id`.
    pub fn internal_deposit(
        &mut self,
        sender_id: AccountId,
        amount: u128,
        msg: DepositMessage,
    ) -> Result<u128, VaultError> {
        self.require_not_paused()?;
        self.require_no_escrow()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let owner_id = msg.receiver_id.unwrap_or(sender_id);
        // Shares are priced on the value the venue credits, net of entry costs.
        let strategy_id = self.current_id()?;
        let added = self.adapter(&strategy_id)?.preview_supply(amount)?;
        let shares = self.internal_convert_to_shares_deposit(added)?;
        if shares == 0 {
            return Err(VaultError::ZeroShares);
        }
        if let Some(min_shares) = msg.min_shares {
            if shares < min_shares.0 {
                return Err(VaultError::MinSharesNotMet {
                    expected: min_shares.0,
                    minted: shares,
                });
            }
        }

        self.adapter_mut(&strategy_id)?.deposit(&owner_id, amount)?;

        self.internal_register_if_needed(&owner_id);
        self.token.internal_deposit(&owner_id, shares);
        FtMint {
            owner_id: &owner_id,
            amount: U128(shares),
            memo: msg.memo.as_deref(),
        }
        .emit();
        self.record_activity(VaultActivity::Deposit {
            account_id: owner_id,
            strategy_id,
            assets: U128(amount),
            shares: U128(shares),
        });
        Ok(shares)
    }

    /// Burns `shares` of `owner_id` and pulls their value out of the pool.
    pub fn internal_redeem(
        &mut self,
        owner_id: AccountId,
        shares: u128,
    ) -> Result<Payout, VaultError> {
        self.require_not_paused()?;
        self.require_no_escrow()?;
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let balance = self.internal_shares_of(&owner_id);
        if shares > balance {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                available: balance,
            });
        }

        let total_shares = self.internal_total_shares();
        let total_assets = self.internal_total_assets();
        let is_last = shares == total_shares;
        let assets = if is_last {
            total_assets
        } else {
            mul_div(shares, total_assets, total_shares, Rounding::Down)
        };
        if assets == 0 {
            return Err(VaultError::NoBackingAssets);
        }

        let strategy_id = self.current_id()?;
        let principal = self.adapter(&strategy_id)?.principal_of(&owner_id);
        let principal_released = if shares == balance {
            principal
        } else {
            mul_div(principal, shares, balance, Rounding::Down)
        };

        let from_idle = assets.min(self.idle_assets);
        let from_strategy = assets - from_idle;
        let adapter = self.adapter_mut(&strategy_id)?;
        let paid = if is_last {
            let delivered = adapter.withdraw_all()?;
            adapter.take_principals();
            from_idle + delivered
        } else if from_strategy > 0 {
            from_idle + adapter.withdraw(&owner_id, from_strategy, principal_released)?
        } else {
            adapter.release_principal(&owner_id, principal_released)?;
            assets
        };

        self.idle_assets -= from_idle;
        self.token.internal_withdraw(&owner_id, shares);
        FtBurn {
            owner_id: &owner_id,
            amount: U128(shares),
            memo: Some("Withdrawal"),
        }
        .emit();

        Ok(Payout {
            kind: PayoutKind::Redeem,
            account_id: owner_id,
            strategy_id,
            assets: U128(paid),
            shares: U128(shares),
            principal_released: U128(principal_released),
        })
    }

    /// Pays out `amount` of `owner_id`'s attributable yield and burns its share value.
    pub fn internal_withdraw_yield(
        &mut self,
        owner_id: AccountId,
        amount: u128,
    ) -> Result<Payout, VaultError> {
        self.require_not_paused()?;
        self.require_no_escrow()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let strategy_id = self.current_id()?;
        let available = self.adapter(&strategy_id)?.get_yield(&owner_id);
        if amount > available {
            return Err(VaultError::InsufficientYield {
                requested: amount,
                available,
            });
        }

        let total_shares = self.internal_total_shares();
        let total_assets = self.internal_total_assets();
        let shares = checked_mul_div(amount, total_shares, total_assets, Rounding::Up)?;
        let balance = self.internal_shares_of(&owner_id);
        if shares > balance {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                available: balance,
            });
        }

        let released = self
            .adapter_mut(&strategy_id)?
            .withdraw_yield(&owner_id, amount)?;
        // The venue may release slightly less than asked; burn for what was paid.
        let shares = checked_mul_div(released, total_shares, total_assets, Rounding::Up)?;
        self.token.internal_withdraw(&owner_id, shares);
        FtBurn {
            owner_id: &owner_id,
            amount: U128(shares),
            memo: Some("Yield withdrawal"),
        }
        .emit();

        Ok(Payout {
            kind: PayoutKind::Yield,
            account_id: owner_id,
            strategy_id,
            assets: U128(released),
            shares: U128(shares),
            principal_released: U128(0),
        })
    }

    /// Settles a payout once its transfer has resolved.
    ///
    /// On failure the shares are re-minted and the assets go back to the
    /// current strategy together with the released principal, or to idle funds
    /// if the strategy refuses them.
    pub fn finalize_payout(&mut self, payout: Payout, transferred: bool) -> U128 {
        if transferred {
            let activity = match payout.kind {
                PayoutKind::Redeem => VaultActivity::Withdraw {
                    account_id: payout.account_id,
                    assets: payout.assets,
                    shares: payout.shares,
                },
                PayoutKind::Yield => VaultActivity::YieldWithdraw {
                    account_id: payout.account_id,
                    strategy_id: payout.strategy_id,
                    assets: payout.assets,
                    shares: payout.shares,
                },
            };
            self.record_activity(activity);
            return payout.assets;
        }

        self.internal_register_if_needed(&payout.account_id);
        self.token
            .internal_deposit(&payout.account_id, payout.shares.0);
        FtMint {
            owner_id: &payout.account_id,
            amount: payout.shares,
            memo: Some("Withdrawal rollback"),
        }
        .emit();

        let restored = match self.current_strategy.clone() {
            Some(strategy_id) if self.rebalance_escrow.is_none() => {
                let principal = [(payout.account_id.clone(), payout.principal_released.0)];
                self.adapter_mut(&strategy_id)
                    .and_then(|adapter| adapter.deposit_all(payout.assets.0, &principal))
            }
            _ => Err(VaultError::NoCurrentStrategy),
        };
        if let Err(err) = restored {
            env::log_str(&format!(
                "payout_restore_to_idle: account_id={} assets={} reason={}",
                payout.account_id, payout.assets.0, err
            ));
            self.idle_assets = self.idle_assets.saturating_add(payout.assets.0);
            // Principal follows the holder even while the assets sit idle.
            if let Some(escrow) = self.rebalance_escrow.as_mut() {
                escrow.principals.push(PrincipalEntry {
                    account_id: payout.account_id.clone(),
                    amount: payout.principal_released,
                });
            } else {
                let credited = match self.current_id() {
                    Ok(strategy_id) => self.adapter_mut(&strategy_id).and_then(|adapter| {
                        adapter.restore_principal(&payout.account_id, payout.principal_released.0)
                    }),
                    Err(err) => Err(err),
                };
                if let Err(err) = credited {
                    env::log_str(&format!(
                        "payout_principal_unrecorded: account_id={} principal={} reason={}",
                        payout.account_id, payout.principal_released.0, err
                    ));
                }
            }
        }

        self.record_activity(VaultActivity::PayoutReverted {
            account_id: payout.account_id,
            assets: payout.assets,
            shares: payout.shares,
        });
        U128(0)
    }
}

#[near]
impl Contract {
    /// Burns `shares` of the caller and transfers their asset value.
    #[payable]
    #[handle_result]
    pub fn withdraw_shares(&mut self, shares: U128) -> Result<Promise, VaultError> {
        assert_one_yocto();
        let payout = self.internal_redeem(env::predecessor_account_id(), shares.0)?;
        Ok(self.internal_transfer_assets_with_callback(payout))
    }

    /// Transfers `amount` of the caller's attributable yield.
    #[payable]
    #[handle_result]
    pub fn withdraw_yield(&mut self, amount: U128) -> Result<Promise, VaultError> {
        assert_one_yocto();
        let payout = self.internal_withdraw_yield(env::predecessor_account_id(), amount.0)?;
        Ok(self.internal_transfer_assets_with_callback(payout))
    }

    #[private]
    pub fn resolve_withdraw(&mut self, payout: Payout) -> U128 {
        let transferred = matches!(env::promise_result(0), PromiseResult::Successful(_));
        self.finalize_payout(payout, transferred)
    }

    /// Supplies vault-held idle funds to the current strategy.
    #[handle_result]
    pub fn reinvest_idle(&mut self) -> Result<U128, VaultError> {
        self.require_role(Role::StrategyController)?;
        self.require_not_paused()?;
        self.require_no_escrow()?;
        let amount = self.idle_assets;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let strategy_id = self.current_id()?;
        self.adapter_mut(&strategy_id)?.supply(amount)?;
        self.idle_assets = 0;
        self.record_activity(VaultActivity::Reinvest {
            strategy_id,
            amount: U128(amount),
        });
        Ok(U128(amount))
    }

    // ==================== View Methods ====================

    pub fn principal_of(&self, account_id: AccountId) -> U128 {
        U128(
            self.current_strategy
                .as_ref()
                .and_then(|id| self.strategies.get(id))
                .map(|adapter| adapter.principal_of(&account_id))
                .unwrap_or(0),
        )
    }

    pub fn yield_of(&self, account_id: AccountId) -> U128 {
        U128(
            self.current_strategy
                .as_ref()
                .and_then(|id| self.strategies.get(id))
                .map(|adapter| adapter.get_yield(&account_id))
                .unwrap_or(0),
        )
    }

    /// Assets per share, scaled by 1e18.
    pub fn share_price(&self) -> U128 {
        U128(self.internal_share_price())
    }

    pub fn ft_total_supply(&self) -> U128 {
        U128(self.internal_total_shares())
    }

    pub fn ft_balance_of(&self, account_id: AccountId) -> U128 {
        U128(self.internal_shares_of(&account_id))
    }

    pub fn get_vault_state(&self) -> VaultState {
        VaultState {
            asset: self.asset.clone(),
            total_assets: U128(self.internal_total_assets()),
            total_shares: U128(self.internal_total_shares()),
            idle_assets: U128(self.idle_assets),
            share_price: U128(self.internal_share_price()),
            current_strategy: self.current_strategy.clone(),
            strategy_count: self.strategies.len(),
            is_paused: self.is_paused,
            rebalance_phase: self.rebalance_phase,
            rebalance_escrow: self.rebalance_escrow.clone(),
            last_rebalance_at: self.last_rebalance_at.map(U64),
        }
    }
}

// ===== Implement Vault Core Trait =====
#[near]
impl VaultCore for Contract {
    fn asset(&self) -> AccountId {
        self.asset.clone()
    }

    fn total_assets(&self) -> U128 {
        U128(self.internal_total_assets())
    }

    fn total_shares(&self) -> U128 {
        U128(self.internal_total_shares())
    }

    fn shares_of(&self, account_id: AccountId) -> U128 {
        U128(self.internal_shares_of(&account_id))
    }

    fn balance_of(&self, account_id: AccountId) -> U128 {
        let shares = self.internal_shares_of(&account_id);
        U128(self.internal_convert_to_assets(shares, Rounding::Down))
    }

    fn convert_to_shares(&self, assets: U128) -> U128 {
        U128(self.internal_convert_to_shares(assets.0, Rounding::Down))
    }

    fn convert_to_assets(&self, shares: U128) -> U128 {
        U128(self.internal_convert_to_assets(shares.0, Rounding::Down))
    }

    fn preview_deposit(&self, assets: U128) -> U128 {
        let shares = self
            .current_id()
            .and_then(|id| self.adapter(&id)?.preview_supply(assets.0))
            .and_then(|added| self.internal_convert_to_shares_deposit(added));
        U128(shares.unwrap_or(0))
    }

    fn preview_redeem(&self, shares: U128) -> U128 {
        U128(self.internal_convert_to_assets(shares.0, Rounding::Down))
    }

    fn max_redeem(&self, owner_id: AccountId) -> U128 {
        if self.is_paused || self.rebalance_escrow.is_some() {
            return U128(0);
        }
        U128(self.internal_shares_of(&owner_id))
    }
}

#[near]
impl FungibleTokenReceiver for Contract {
    /// Deposits the transferred amount. Returns the unused amount, which is
    /// everything when the deposit is rejected.
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        if env::predecessor_account_id() != self.asset {
            env::panic_str("Only the underlying asset can call ft_on_transfer");
        }

        let parsed = if msg.trim().is_empty() {
            Ok(DepositMessage::default())
        } else {
            serde_json::from_str::<DepositMessage>(&msg)
        };
        let deposit = match parsed {
            Ok(deposit) => deposit,
            Err(err) => {
                env::log_str(&format!(
                    "deposit_refunded: sender_id={sender_id} amount={} reason=invalid msg: {err}",
                    amount.0
                ));
                return PromiseOrValue::Value(amount);
            }
        };

        match self.internal_deposit(sender_id.clone(), amount.0, deposit) {
            Ok(_) => PromiseOrValue::Value(U128(0)),
            Err(err) => {
                env::log_str(&format!(
                    "deposit_refunded: sender_id={sender_id} amount={} reason={err}",
                    amount.0
                ));
                PromiseOrValue::Value(amount)
            }
        }
    }
}

#[near]
impl FungibleTokenMetadataProvider for Contract {
    fn ft_metadata(&self) -> FungibleTokenMetadata {
        self.metadata.clone()
    }
}
