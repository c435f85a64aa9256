// Scenario builder for the vault tests.
// Registers strategies as the owner, then hands the contract to the test.

use strategy_vault::config::VaultConfig;
use strategy_vault::strategies::StrategyReport;
use strategy_vault::Contract;
use near_contract_standards::fungible_token::metadata::FungibleTokenMetadata;

use super::*;

pub struct TestScenarioBuilder {
    controller: Option<String>,
    config: Option<VaultConfig>,
    strategies: Vec<(String, u8, i64, StrategyReport)>,
}

impl TestScenarioBuilder {
    pub fn new() -> Self {
        Self {
            controller: Some(KEEPER.to_string()),
            config: None,
            strategies: Vec::new(),
        }
    }

    pub fn config(mut self, config: VaultConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds a strategy; the first one added becomes current.
    pub fn strategy(mut self, id: &str, risk_level: u8, apy_bps: i64, report: StrategyReport) -> Self {
        self.strategies
            .push((id.to_string(), risk_level, apy_bps, report));
        self
    }

    pub fn build(self) -> Contract {
        act_as(VAULT, 0);
        let metadata = FungibleTokenMetadata {
            spec: "ft-1.0.0".to_string(),
            name: "USDC Strategy Vault Shares".to_string(),
            symbol: "svUSDC".to_string(),
            icon: None,
            reference: None,
            reference_hash: None,
            decimals: 6,
        };
        let mut contract = Contract::init(
            account(OWNER),
            account(ASSET),
            metadata,
            self.controller.as_deref().map(account),
            self.config,
        );

        act_as(OWNER, 0);
        for (id, risk_level, apy_bps, report) in self.strategies {
            contract
                .register_strategy(id, risk_level, apy_bps, report)
                .unwrap();
        }
        contract
    }
}
