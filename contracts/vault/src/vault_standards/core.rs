//! # Vault Core Interface
//!
//! The share/asset surface of the vault, modelled on the NEP-621 vault
//! standard. Share balances are not transferable, so the trait does not
//! extend `FungibleTokenCore`.

use near_sdk::{json_types::U128, AccountId};
use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

pub trait VaultCore {
    /// The NEP-141 token the vault accepts and pays out.
    fn asset(&self) -> AccountId;
    /// Assets backing all shares: current strategy value plus vault-held funds.
    fn total_assets(&self) -> U128;
    /// Sum of all share balances.
    fn total_shares(&self) -> U128;
    /// Share balance of `account_id`.
    fn shares_of(&self, account_id: AccountId) -> U128;
    /// Asset value of the shares held by `account_id`, rounded down.
    fn balance_of(&self, account_id: AccountId) -> U128;
    /// Shares minted for `assets` at the current share price, rounded down.
    fn convert_to_shares(&self, assets: U128) -> U128;
    /// Assets paid for `shares` at the current share price, rounded down.
    fn convert_to_assets(&self, shares: U128) -> U128;
    /// Shares a deposit of `assets` would mint right now.
    fn preview_deposit(&self, assets: U128) -> U128;
    /// Assets a redemption of `shares` would pay right now.
    fn preview_redeem(&self, shares: U128) -> U128;
    /// Largest share amount `owner_id` can redeem.
    fn max_redeem(&self, owner_id: AccountId) -> U128;
}
