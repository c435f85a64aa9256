//! # Rebalance Tests
//!
//! Migration of the pooled position between strategies.
//!
//! Scores are `apy_bps * (risk_ceiling - risk) * tvl_factor`; with the
//! default ceiling of 10 and no TVL bonus, Venus at 500 bps / risk 3 scores
//! 350_000 and a destination needs at least 420_000 to clear the 20% gate.
//!
//! ```text
//! 1. Alice deposits 1_000 into Venus (current)
//! 2. Keeper rebalances Venus -> Aave
//! 3. Pointer, principal records and history follow the funds
//! ```

mod helpers;

use helpers::test_builder::TestScenarioBuilder;
use helpers::*;
use near_sdk::json_types::U128;
use strategy_vault::error::{ErrorKind, VaultError};
use strategy_vault::rebalance::{RebalanceOutcome, RebalancePhase};
use strategy_vault::vault_standards::VaultCore;
use strategy_vault::Contract;

fn venus_and_aave(aave_apy_bps: i64) -> Contract {
    let mut c = TestScenarioBuilder::new()
        .strategy("venus", 3, 500, venus(E18))
        .strategy("aave", 3, aave_apy_bps, aave(RAY))
        .build();
    deposit(&mut c, ALICE, 1_000);
    c
}

fn rebalance_at(
    c: &mut Contract,
    from: &str,
    to: &str,
    amount: u128,
    timestamp_ns: u64,
) -> Result<RebalanceOutcome, VaultError> {
    act_as(KEEPER, timestamp_ns);
    c.rebalance(from.to_string(), to.to_string(), U128(amount))
}

#[test]
fn test_rebalance_moves_funds_and_pointer() {
    let mut c = venus_and_aave(600);
    let outcome = rebalance_at(&mut c, "venus", "aave", 1_000, 0).unwrap();

    let record = match outcome {
        RebalanceOutcome::Completed { record } => record,
        other => panic!("expected a completed rebalance, got {other:?}"),
    };
    assert_eq!(record.amount_moved, U128(1_000));
    assert_eq!(record.reason_score.0, 420_000);

    assert_eq!(c.get_current_strategy(), Some("aave".to_string()));
    assert_eq!(c.get_rebalance_phase(), RebalancePhase::Idle);
    assert_eq!(c.total_assets(), U128(1_000));
    assert_eq!(c.principal_of(account(ALICE)), U128(1_000));
    assert!(c.get_principals("venus".to_string()).is_empty());
    assert_eq!(c.get_strategy("aave".to_string()).unwrap().total_assets, U128(1_000));
    assert_eq!(c.get_rebalance_history(None, None), vec![record]);

    let events = vault_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].contains("\"event\":\"rebalance\""));

    // New deposits follow the pointer.
    deposit(&mut c, BOB, 500);
    assert_eq!(c.get_strategy("aave".to_string()).unwrap().total_assets, U128(1_500));
}

#[test]
fn test_improvement_gate() {
    let mut c = venus_and_aave(550);
    assert_eq!(
        rebalance_at(&mut c, "venus", "aave", 1_000, 0),
        Err(VaultError::InsufficientImprovement {
            current_score: 350_000,
            candidate_score: 385_000,
        })
    );
    assert_eq!(c.analyze().recommended, None);
    assert_eq!(c.get_current_strategy(), Some("venus".to_string()));

    let c = venus_and_aave(600);
    assert_eq!(c.analyze().recommended, Some("aave".to_string()));
}

#[test]
fn test_unhealthy_destination_is_excluded() {
    let mut c = TestScenarioBuilder::new()
        .strategy("venus", 3, 500, venus(E18))
        .strategy("aave", 3, 900, unreachable(aave(RAY)))
        .build();
    deposit(&mut c, ALICE, 1_000);

    let analysis = c.analyze();
    assert_eq!(analysis.candidates.len(), 1);
    assert!(!analysis.candidates[0].healthy);
    assert_eq!(analysis.recommended, None);

    let err = rebalance_at(&mut c, "venus", "aave", 1_000, 0).unwrap_err();
    assert_eq!(err, VaultError::DestinationUnhealthy("aave".to_string()));
    assert_eq!(err.kind(), ErrorKind::HealthDegraded);
    act_as(KEEPER, 0);
    assert_eq!(c.auto_rebalance(), Err(VaultError::NoEligibleCandidate));

    act_as(KEEPER, 0);
    c.report_strategy("aave".to_string(), aave(RAY)).unwrap();
    let outcome = c.auto_rebalance().unwrap();
    assert!(matches!(outcome, RebalanceOutcome::Completed { .. }));
    assert_eq!(c.get_current_strategy(), Some("aave".to_string()));
}

#[test]
fn test_cooldown_between_rebalances() {
    let mut c = venus_and_aave(600);
    rebalance_at(&mut c, "venus", "aave", 1_000, 0).unwrap();

    assert_eq!(
        rebalance_at(&mut c, "aave", "venus", 1_000, HOUR_NS),
        Err(VaultError::CooldownActive {
            remaining_ns: 5 * HOUR_NS
        })
    );
    assert_eq!(c.analyze().cooldown_remaining_ns.0, 5 * HOUR_NS);

    // Cooldown over; Venus now fails the improvement gate instead.
    assert!(matches!(
        rebalance_at(&mut c, "aave", "venus", 1_000, 6 * HOUR_NS),
        Err(VaultError::InsufficientImprovement { .. })
    ));
}

#[test]
fn test_slippage_floor() {
    let mut c = venus_and_aave(600);
    assert_eq!(
        rebalance_at(&mut c, "venus", "aave", 1_006, 0),
        Err(VaultError::SlippageExceeded {
            expected: 1_006,
            available: 1_000,
        })
    );
    assert_eq!(c.get_current_strategy(), Some("venus".to_string()));

    // 1_005 * 99.5% rounds up to exactly 1_000.
    assert!(rebalance_at(&mut c, "venus", "aave", 1_005, 0).is_ok());
}

#[test]
fn test_gate_checks_precede_fund_movement() {
    let mut c = venus_and_aave(600);
    assert_eq!(
        rebalance_at(&mut c, "aave", "venus", 1_000, 0),
        Err(VaultError::NotCurrentStrategy("aave".to_string()))
    );
    assert_eq!(
        rebalance_at(&mut c, "venus", "venus", 1_000, 0),
        Err(VaultError::SameStrategy)
    );
    assert!(matches!(
        rebalance_at(&mut c, "venus", "compound", 1_000, 0),
        Err(VaultError::UnknownStrategy(_))
    ));

    act_as(ALICE, 0);
    assert!(matches!(
        c.rebalance("venus".to_string(), "aave".to_string(), U128(1_000)),
        Err(VaultError::Unauthorized { .. })
    ));
    assert_eq!(c.get_strategy("venus".to_string()).unwrap().total_assets, U128(1_000));
}

#[test]
fn test_double_failure_escrows_funds() {
    let mut c = TestScenarioBuilder::new()
        .strategy("venus", 3, 500, venus(E18))
        .strategy("morpho", 3, 100, morpho(500))
        .build();
    deposit(&mut c, ALICE, 1_000);

    // Venus stops minting: it becomes unhealthy and cannot take funds back.
    act_as(KEEPER, 0);
    c.report_strategy("venus".to_string(), venus_with(E18, DEEP_CASH, true))
        .unwrap();

    let outcome = rebalance_at(&mut c, "venus", "morpho", 1_000, 0).unwrap();
    assert_eq!(outcome, RebalanceOutcome::Escrowed { amount: U128(1_000) });
    assert_eq!(c.get_rebalance_phase(), RebalancePhase::Escrowed);
    let escrow = c.get_rebalance_escrow().unwrap();
    assert_eq!(escrow.amount, U128(1_000));
    assert_eq!(escrow.principals.len(), 1);
    assert_eq!(c.total_assets(), U128(1_000));
    assert_eq!(vault_events().len(), 1);

    // Everything but views is blocked.
    assert_eq!(deposit(&mut c, BOB, 100), U128(100));
    act_as_with_deposit(ALICE, 0, 1);
    assert!(matches!(
        c.withdraw_shares(U128(10)),
        Err(VaultError::RebalanceInProgress)
    ));
    assert_eq!(c.max_redeem(account(ALICE)), U128(0));
    assert_eq!(
        rebalance_at(&mut c, "venus", "morpho", 1_000, 0),
        Err(VaultError::RebalanceInProgress)
    );

    // Morpho still refuses; the escrow stays.
    act_as(OWNER, 0);
    let err = c.resolve_escrow(Some("morpho".to_string())).unwrap_err();
    assert!(err.is_retryable());
    assert!(c.get_rebalance_escrow().is_some());

    act_as(KEEPER, 0);
    c.report_strategy("venus".to_string(), venus(E18)).unwrap();
    act_as(OWNER, 0);
    assert_eq!(c.resolve_escrow(None), Ok("venus".to_string()));

    assert_eq!(c.get_rebalance_escrow(), None);
    assert_eq!(c.get_rebalance_phase(), RebalancePhase::Idle);
    assert_eq!(c.get_current_strategy(), Some("venus".to_string()));
    assert_eq!(c.principal_of(account(ALICE)), U128(1_000));
    assert_eq!(c.total_assets(), U128(1_000));
    assert_eq!(deposit(&mut c, BOB, 100), U128(0));
}

#[test]
fn test_destination_failure_rolls_back() {
    let mut c = TestScenarioBuilder::new()
        .strategy("venus", 3, 500, venus(E18))
        .strategy("morpho", 3, 1_000, morpho(500))
        .build();
    deposit(&mut c, ALICE, 1_000);

    let outcome = rebalance_at(&mut c, "venus", "morpho", 1_000, 0).unwrap();
    assert!(matches!(outcome, RebalanceOutcome::RolledBack { .. }));
    assert_eq!(c.get_current_strategy(), Some("venus".to_string()));
    assert_eq!(c.get_rebalance_phase(), RebalancePhase::Idle);
    assert_eq!(c.get_strategy("venus".to_string()).unwrap().total_assets, U128(1_000));
    assert_eq!(c.principal_of(account(ALICE)), U128(1_000));
    assert!(c.get_rebalance_history(None, None).is_empty());
    assert!(vault_events().is_empty());
}
