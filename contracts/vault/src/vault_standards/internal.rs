//! # Internal Vault Operations
//!
//! Share/asset conversions and the payout transfer used by the public
//! ledger methods.
//!
//! ## Key Functions
//!
//! - `internal_total_assets`: Current strategy value plus vault-held funds
//! - `internal_convert_to_shares_deposit`: Shares minted for a deposit
//! - `internal_convert_to_assets`: Assets paid for a share amount
//! - `internal_transfer_assets_with_callback`: `ft_transfer` + `resolve_withdraw`

use near_contract_standards::fungible_token::{core::ext_ft_core, FungibleTokenCore};
use near_sdk::{env, ext_contract, json_types::U128, near, AccountId, Gas, NearToken, Promise};

use super::mul_div::{checked_mul_div, mul_div, Rounding};
use crate::error::VaultError;
use crate::registry::StrategyId;
use crate::Contract;

/// Gas allocation for asset transfer during withdrawal.
pub const GAS_FOR_FT_TRANSFER: Gas = Gas::from_tgas(30);
/// Gas allocation for `resolve_withdraw`, which may re-supply a venue.
pub const GAS_FOR_RESOLVE_WITHDRAW: Gas = Gas::from_tgas(20);

/// Fixed-point scale of `share_price`.
pub const SHARE_PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

#[near(serializers = [json])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayoutKind {
    /// Shares redeemed for their asset value.
    Redeem,
    /// Attributable yield withdrawn; principal untouched.
    Yield,
}

/// Everything `resolve_withdraw` needs to finalize or revert a payout.
#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payout {
    pub kind: PayoutKind,
    pub account_id: AccountId,
    pub strategy_id: StrategyId,
    pub assets: U128,
    pub shares: U128,
    pub principal_released: U128,
}

// ============================================================================
// External Contract Interface
// ============================================================================

/// Callback interface for withdrawal resolution.
#[ext_contract(ext_self)]
pub trait _ExtSelf {
    /// Called after the asset transfer to finalize or roll back the payout.
    fn resolve_withdraw(&mut self, payout: Payout) -> U128;
}

// ============================================================================
// Contract Implementation
// ============================================================================

impl Contract {
    /// Current strategy value plus idle funds and any rebalance escrow.
    pub fn internal_total_assets(&self) -> u128 {
        let strategy = self
            .current_strategy
            .as_ref()
            .and_then(|id| self.strategies.get(id))
            .map(|adapter| adapter.total_assets())
            .unwrap_or(0);
        let escrow = self
            .rebalance_escrow
            .as_ref()
            .map(|escrow| escrow.amount.0)
            .unwrap_or(0);
        strategy.saturating_add(self.idle_assets).saturating_add(escrow)
    }

    pub fn internal_total_shares(&self) -> u128 {
        self.token.ft_total_supply().0
    }

    pub fn internal_shares_of(&self, account_id: &AccountId) -> u128 {
        self.token.ft_balance_of(account_id.clone()).0
    }

    /// Shares minted for `assets` of value added to the pool, priced before the deposit.
    ///
    /// The first deposit into an empty pool mints shares 1:1.
    pub fn internal_convert_to_shares_deposit(&self, assets: u128) -> Result<u128, VaultError> {
        let total_shares = self.internal_total_shares();
        if total_shares == 0 {
            return Ok(assets);
        }
        let total_assets = self.internal_total_assets();
        if total_assets == 0 {
            return Err(VaultError::NoBackingAssets);
        }
        checked_mul_div(assets, total_shares, total_assets, Rounding::Down)
    }

    /// Converts an asset amount to shares at the current price.
    pub fn internal_convert_to_shares(&self, assets: u128, rounding: Rounding) -> u128 {
        let total_shares = self.internal_total_shares();
        if total_shares == 0 {
            return assets;
        }
        let total_assets = self.internal_total_assets();
        if total_assets == 0 {
            return 0;
        }
        checked_mul_div(assets, total_shares, total_assets, rounding).unwrap_or(u128::MAX)
    }

    /// Converts shares to assets at the current price.
    pub fn internal_convert_to_assets(&self, shares: u128, rounding: Rounding) -> u128 {
        let total_shares = self.internal_total_shares();
        if total_shares == 0 {
            return shares;
        }
        let shares = shares.min(total_shares);
        mul_div(shares, self.internal_total_assets(), total_shares, rounding)
    }

    pub fn internal_share_price(&self) -> u128 {
        let total_shares = self.internal_total_shares();
        if total_shares == 0 {
            return SHARE_PRICE_SCALE;
        }
        checked_mul_div(
            self.internal_total_assets(),
            SHARE_PRICE_SCALE,
            total_shares,
            Rounding::Down,
        )
        .unwrap_or(u128::MAX)
    }

    /// Registers `account_id` with the share token if it is new.
    pub(crate) fn internal_register_if_needed(&mut self, account_id: &AccountId) {
        if !self.token.accounts.contains_key(account_id) {
            self.token.internal_register_account(account_id);
        }
    }

    /// Transfers the payout to its account and resolves it in `resolve_withdraw`.
    pub fn internal_transfer_assets_with_callback(&self, payout: Payout) -> Promise {
        ext_ft_core::ext(self.asset.clone())
            .with_attached_deposit(NearToken::from_yoctonear(1))
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(payout.account_id.clone(), payout.assets, None)
            .then(
                ext_self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_WITHDRAW)
                    .resolve_withdraw(payout),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::builders::ContractBuilder;

    #[test]
    fn empty_pool_converts_one_to_one() {
        let c = ContractBuilder::new("owner.test", "usdc.test").build();
        assert_eq!(c.internal_convert_to_shares_deposit(1_000).unwrap(), 1_000);
        assert_eq!(c.internal_convert_to_assets(1_000, Rounding::Down), 1_000);
        assert_eq!(c.internal_share_price(), SHARE_PRICE_SCALE);
    }

    #[test]
    fn shares_without_assets_cannot_be_priced() {
        let c = ContractBuilder::new("owner.test", "usdc.test")
            .shares("alice.test", 100)
            .build();
        assert_eq!(
            c.internal_convert_to_shares_deposit(10),
            Err(VaultError::NoBackingAssets)
        );
    }

    #[test]
    fn idle_assets_count_toward_total() {
        let c = ContractBuilder::new("owner.test", "usdc.test")
            .shares("alice.test", 100)
            .idle_assets(150)
            .build();
        assert_eq!(c.internal_total_assets(), 150);
        assert_eq!(c.internal_convert_to_shares_deposit(30).unwrap(), 20);
        assert_eq!(c.internal_convert_to_assets(10, Rounding::Down), 15);
        assert_eq!(c.internal_share_price(), SHARE_PRICE_SCALE * 3 / 2);
    }
}
