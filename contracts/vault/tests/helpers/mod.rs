//! # Test Helpers Module
//!
//! Common infrastructure for the vault scenario tests. Scenarios drive the
//! contract directly inside the mocked NEAR runtime: every call is preceded
//! by a fresh VM context naming the caller and the block timestamp.
//!
//! ## Modules
//!
//! - [`test_builder`]: Builder pattern for constructing test scenarios
//!
//! ## Key Functions
//!
//! - [`act_as`]: Sets the caller and block timestamp for the next call
//! - [`deposit`]: Deposits through `ft_on_transfer` and returns the refund
//! - [`vault_events`]: Collects the vault's `EVENT_JSON` logs of the last call

#![allow(dead_code)]

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::json_types::U128;
use near_sdk::test_utils::{get_logs, VMContextBuilder};
use near_sdk::{testing_env, AccountId, NearToken, PromiseOrValue};
use strategy_vault::strategies::aave::AaveReport;
use strategy_vault::strategies::morpho::MorphoReport;
use strategy_vault::strategies::pancakeswap::PancakeReport;
use strategy_vault::strategies::venus::VenusReport;
use strategy_vault::strategies::{StrategyReport, VenueReport};
use strategy_vault::Contract;

pub mod test_builder;

// ============================================================================
// Constants
// ============================================================================

pub const VAULT: &str = "vault.test";
pub const OWNER: &str = "owner.test";
pub const KEEPER: &str = "keeper.test";
pub const ASSET: &str = "usdc.test";
pub const ALICE: &str = "alice.test";
pub const BOB: &str = "bob.test";
pub const CAROL: &str = "carol.test";

/// One unit of the 1e18 fixed-point venue prices.
pub const E18: u128 = 1_000_000_000_000_000_000;
/// One unit of the 1e27 Aave liquidity index.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;
/// Cash deep enough that venue liquidity never limits a test.
pub const DEEP_CASH: u128 = u128::MAX / 4;
pub const HOUR_NS: u64 = 3_600_000_000_000;

// ============================================================================
// Context
// ============================================================================

pub fn account(id: &str) -> AccountId {
    id.parse().unwrap()
}

/// Sets `caller` as predecessor at `timestamp_ns`, attaching `yocto`.
pub fn act_as_with_deposit(caller: &str, timestamp_ns: u64, yocto: u128) {
    let mut builder = VMContextBuilder::new();
    builder
        .current_account_id(account(VAULT))
        .predecessor_account_id(account(caller))
        .attached_deposit(NearToken::from_yoctonear(yocto))
        .block_timestamp(timestamp_ns);
    testing_env!(builder.build());
}

pub fn act_as(caller: &str, timestamp_ns: u64) {
    act_as_with_deposit(caller, timestamp_ns, 0);
}

/// Deposits `amount` for `sender` the way the asset contract delivers it.
pub fn deposit_with_msg(
    contract: &mut Contract,
    sender: &str,
    amount: u128,
    msg: &str,
    timestamp_ns: u64,
) -> U128 {
    act_as(ASSET, timestamp_ns);
    match contract.ft_on_transfer(account(sender), U128(amount), msg.to_string()) {
        PromiseOrValue::Value(refund) => refund,
        PromiseOrValue::Promise(_) => panic!("deposit returned a promise"),
    }
}

pub fn deposit(contract: &mut Contract, sender: &str, amount: u128) -> U128 {
    deposit_with_msg(contract, sender, amount, "", 0)
}

/// `EVENT_JSON` logs of the vault's own event standard.
pub fn vault_events() -> Vec<String> {
    get_logs()
        .into_iter()
        .filter(|log| log.starts_with("EVENT_JSON:") && log.contains("\"standard\":\"strategy_vault\""))
        .collect()
}

// ============================================================================
// Keeper reports
// ============================================================================

pub fn report(venue: VenueReport) -> StrategyReport {
    StrategyReport {
        venue,
        venue_tvl: U128(0),
        reachable: true,
        risk_level: None,
    }
}

pub fn venus(exchange_rate: u128) -> StrategyReport {
    venus_with(exchange_rate, DEEP_CASH, false)
}

pub fn venus_with(exchange_rate: u128, cash: u128, mint_paused: bool) -> StrategyReport {
    report(VenueReport::Venus(VenusReport {
        exchange_rate: U128(exchange_rate),
        cash: U128(cash),
        supply_rate_bps: 0,
        mint_paused,
        redeem_paused: false,
    }))
}

pub fn aave(liquidity_index: u128) -> StrategyReport {
    report(VenueReport::Aave(AaveReport {
        liquidity_index: U128(liquidity_index),
        available_liquidity: U128(0),
        liquidity_rate_bps: 0,
        is_frozen: false,
        is_paused: false,
    }))
}

/// An empty Morpho vault accepting at most `supply_cap` (zero means uncapped).
pub fn morpho(supply_cap: u128) -> StrategyReport {
    report(VenueReport::Morpho(MorphoReport {
        total_assets: U128(0),
        total_supply: U128(0),
        idle_liquidity: U128(0),
        supply_cap: U128(supply_cap),
    }))
}

/// A stable-swap farm at a virtual price of 1.0 charging `zap_fee_bps` on entry.
pub fn pancakeswap(zap_fee_bps: u16) -> StrategyReport {
    report(VenueReport::PancakeSwap(PancakeReport {
        virtual_price: U128(E18),
        zap_fee_bps,
        harvested_rewards: U128(0),
        farm_paused: false,
    }))
}

pub fn unreachable(mut report: StrategyReport) -> StrategyReport {
    report.reachable = false;
    report
}
