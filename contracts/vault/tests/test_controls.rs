//! # Operational Control Tests
//!
//! Pause, emergency withdrawal, idle reinvestment and role enforcement.

mod helpers;

use helpers::test_builder::TestScenarioBuilder;
use helpers::*;
use near_sdk::json_types::U128;
use strategy_vault::access::Role;
use strategy_vault::config::VaultConfig;
use strategy_vault::error::VaultError;
use strategy_vault::vault_standards::VaultCore;
use strategy_vault::Contract;

fn funded_vault() -> Contract {
    let mut c = TestScenarioBuilder::new()
        .strategy("venus", 3, 500, venus(E18))
        .strategy("aave", 3, 600, aave(RAY))
        .build();
    deposit(&mut c, ALICE, 1_000);
    c
}

#[test]
fn test_pause_blocks_mutations_but_not_views() {
    let mut c = funded_vault();
    act_as(OWNER, 0);
    c.pause().unwrap();
    assert_eq!(vault_events().len(), 1);

    assert_eq!(deposit(&mut c, BOB, 100), U128(100));
    act_as_with_deposit(ALICE, 0, 1);
    assert!(matches!(c.withdraw_shares(U128(100)), Err(VaultError::Paused)));
    act_as(KEEPER, 0);
    assert_eq!(
        c.rebalance("venus".to_string(), "aave".to_string(), U128(1_000)),
        Err(VaultError::Paused)
    );
    assert_eq!(c.auto_rebalance(), Err(VaultError::Paused));

    assert_eq!(c.total_assets(), U128(1_000));
    assert_eq!(c.balance_of(account(ALICE)), U128(1_000));
    assert_eq!(c.max_redeem(account(ALICE)), U128(0));
    assert!(c.get_vault_state().is_paused);

    act_as(OWNER, 0);
    c.unpause().unwrap();
    act_as_with_deposit(ALICE, 0, 1);
    assert!(c.withdraw_shares(U128(100)).is_ok());
    assert_eq!(c.shares_of(account(ALICE)), U128(900));
}

#[test]
fn test_emergency_withdraw_and_recovery() {
    let mut c = funded_vault();
    // Only 400 of cash left in the Venus market.
    act_as(KEEPER, 0);
    c.report_strategy("venus".to_string(), venus_with(E18, 400, false))
        .unwrap();

    act_as(KEEPER, 0);
    assert!(matches!(
        c.emergency_withdraw(None),
        Err(VaultError::Unauthorized { role: Role::Owner, .. })
    ));

    act_as(OWNER, 0);
    c.pause().unwrap();
    let report = c.emergency_withdraw(None).unwrap();
    assert_eq!(report.recovered, U128(400));
    assert_eq!(report.unrecovered, U128(600));
    let state = c.get_vault_state();
    assert_eq!(state.idle_assets, U128(400));
    assert_eq!(state.total_assets, U128(1_000));
    assert_eq!(c.principal_of(account(ALICE)), U128(1_000));

    // Liquidity returns; withdrawals drain idle funds first.
    act_as(KEEPER, 0);
    c.report_strategy("venus".to_string(), venus(E18)).unwrap();
    act_as(OWNER, 0);
    c.unpause().unwrap();
    act_as(VAULT, 0);
    let payout = c.internal_redeem(account(ALICE), 500).unwrap();
    assert_eq!(payout.assets, U128(500));
    assert_eq!(c.get_vault_state().idle_assets, U128(0));
    assert_eq!(c.get_strategy("venus".to_string()).unwrap().total_assets, U128(500));
    assert_eq!(c.principal_of(account(ALICE)), U128(500));
}

#[test]
fn test_reinvest_idle_returns_funds_to_strategy() {
    let mut c = funded_vault();
    act_as(OWNER, 0);
    c.emergency_withdraw(None).unwrap();
    assert_eq!(c.get_vault_state().idle_assets, U128(1_000));

    act_as(ALICE, 0);
    assert!(matches!(
        c.reinvest_idle(),
        Err(VaultError::Unauthorized { .. })
    ));
    act_as(KEEPER, 0);
    assert_eq!(c.reinvest_idle(), Ok(U128(1_000)));
    assert_eq!(c.get_vault_state().idle_assets, U128(0));
    assert_eq!(c.get_strategy("venus".to_string()).unwrap().total_assets, U128(1_000));
    assert_eq!(c.total_assets(), U128(1_000));
}

#[test]
fn test_role_enforcement() {
    let mut c = funded_vault();

    act_as(KEEPER, 0);
    assert!(matches!(c.pause(), Err(VaultError::Unauthorized { .. })));
    assert!(matches!(
        c.update_config(VaultConfig::default()),
        Err(VaultError::Unauthorized { .. })
    ));
    assert!(matches!(
        c.register_strategy("beefy".to_string(), 2, 0, venus(E18)),
        Err(VaultError::Unauthorized { .. })
    ));
    assert_eq!(c.resolve_escrow(None).map(|_| ()), Err(VaultError::Unauthorized {
        account: account(KEEPER),
        role: Role::Owner,
    }));

    act_as(OWNER, 0);
    c.set_strategy_controller(Some(account(BOB))).unwrap();
    act_as(KEEPER, 0);
    assert!(matches!(
        c.report_strategy("venus".to_string(), venus(E18)),
        Err(VaultError::Unauthorized { .. })
    ));
    act_as(BOB, 0);
    assert!(c.report_strategy("venus".to_string(), venus(E18)).is_ok());
}

#[test]
fn test_config_update_changes_gate() {
    let mut c = TestScenarioBuilder::new()
        .strategy("venus", 3, 500, venus(E18))
        .strategy("aave", 3, 550, aave(RAY))
        .build();
    deposit(&mut c, ALICE, 1_000);
    assert_eq!(c.analyze().recommended, None);

    act_as(OWNER, 0);
    assert_eq!(
        c.update_config(VaultConfig {
            risk_ceiling: 0,
            ..Default::default()
        }),
        Err(VaultError::InvalidConfig("risk_ceiling"))
    );
    c.update_config(VaultConfig {
        min_improvement_pct: 10,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(c.get_config().min_improvement_pct, 10);
    assert_eq!(c.analyze().recommended, Some("aave".to_string()));
}
