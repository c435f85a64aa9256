//! # Test Utilities
//!
//! Helpers and builders for unit testing the contract. They handle NEAR SDK
//! context setup, keeper report construction and contract configuration.
//!
//! ## Modules
//!
//! - [`helpers`]: Context setup and deposits
//! - [`reports`]: Keeper reports for the venues used in tests
//! - [`builders`]: Builder pattern for flexible contract configuration

/// Helper functions for test context and deposits.
#[cfg(test)]
pub mod helpers {
    use crate::Contract;
    use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
    use near_sdk::json_types::U128;
    use near_sdk::test_utils::VMContextBuilder;
    use near_sdk::{env, testing_env, NearToken, PromiseOrValue};

    /// Initializes the NEAR VM context at block timestamp zero.
    ///
    /// ```ignore
    /// init_ctx("alice.test", 1); // Alice calls with 1 yoctoNEAR
    /// contract.withdraw_shares(U128(10));
    /// ```
    pub fn init_ctx(predecessor: &str, deposit_yocto: u128) {
        init_ctx_at(predecessor, deposit_yocto, 0);
    }

    /// Initializes the NEAR VM context at `timestamp_ns`.
    pub fn init_ctx_at(predecessor: &str, deposit_yocto: u128, timestamp_ns: u64) {
        let mut builder = VMContextBuilder::new();
        builder
            .current_account_id("vault.test".parse().unwrap())
            .predecessor_account_id(predecessor.parse().unwrap())
            .attached_deposit(NearToken::from_yoctonear(deposit_yocto))
            .block_timestamp(timestamp_ns);
        testing_env!(builder.build());
    }

    /// Deposits `amount` for `sender` as an `ft_transfer_call` from the asset
    /// contract, keeping the current block timestamp. Returns the refund.
    pub fn deposit(contract: &mut Contract, sender: &str, amount: u128) -> U128 {
        let asset = contract.asset.to_string();
        init_ctx_at(&asset, 0, env::block_timestamp());
        match contract.ft_on_transfer(sender.parse().unwrap(), U128(amount), String::new()) {
            PromiseOrValue::Value(refund) => refund,
            PromiseOrValue::Promise(_) => panic!("deposit returned a promise"),
        }
    }
}

/// Keeper reports with reachable venues and no TVL or risk update.
#[cfg(test)]
pub mod reports {
    use crate::strategies::aave::AaveReport;
    use crate::strategies::beefy::BeefyReport;
    use crate::strategies::venus::VenusReport;
    use crate::strategies::{StrategyReport, VenueReport};
    use near_sdk::json_types::U128;

    pub fn report(venue: VenueReport) -> StrategyReport {
        StrategyReport {
            venue,
            venue_tvl: U128(0),
            reachable: true,
            risk_level: None,
        }
    }

    pub fn venus_report(exchange_rate: u128, cash: u128) -> StrategyReport {
        report(VenueReport::Venus(VenusReport {
            exchange_rate: U128(exchange_rate),
            cash: U128(cash),
            supply_rate_bps: 0,
            mint_paused: false,
            redeem_paused: false,
        }))
    }

    pub fn aave_report(liquidity_index: u128, available_liquidity: u128) -> StrategyReport {
        report(VenueReport::Aave(AaveReport {
            liquidity_index: U128(liquidity_index),
            available_liquidity: U128(available_liquidity),
            liquidity_rate_bps: 0,
            is_frozen: false,
            is_paused: false,
        }))
    }

    pub fn beefy_report(price_per_full_share: u128, paused: bool) -> StrategyReport {
        report(VenueReport::Beefy(BeefyReport {
            price_per_full_share: U128(price_per_full_share),
            withdrawal_fee_bps: 0,
            paused,
        }))
    }
}

/// Builder pattern for flexible contract configuration in tests.
#[cfg(test)]
pub mod builders {
    use crate::config::VaultConfig;
    use crate::strategies::StrategyReport;
    use crate::test_utils::helpers::init_ctx;
    use crate::Contract;
    use near_contract_standards::fungible_token::metadata::FungibleTokenMetadata;

    struct StrategySpec {
        id: String,
        risk_level: u8,
        apy_bps: i64,
        report: StrategyReport,
    }

    /// Builder for test `Contract` instances.
    ///
    /// ```ignore
    /// let contract = ContractBuilder::new("owner.test", "usdc.test")
    ///     .controller("keeper.test")
    ///     .strategy("venus", venus_report(EXP_SCALE, 1_000_000))
    ///     .predecessor("keeper.test")
    ///     .build();
    /// ```
    pub struct ContractBuilder {
        owner: String,
        asset: String,
        controller: Option<String>,
        config: Option<VaultConfig>,
        strategies: Vec<StrategySpec>,
        shares: Vec<(String, u128)>,
        idle_assets: u128,
        predecessor: Option<String>,
        attached: u128,
    }

    impl ContractBuilder {
        pub fn new(owner: &str, asset: &str) -> Self {
            Self {
                owner: owner.to_string(),
                asset: asset.to_string(),
                controller: None,
                config: None,
                strategies: vec![],
                shares: vec![],
                idle_assets: 0,
                predecessor: Some(owner.to_string()),
                attached: 0,
            }
        }

        pub fn controller(mut self, id: &str) -> Self {
            self.controller = Some(id.to_string());
            self
        }

        pub fn config(mut self, config: VaultConfig) -> Self {
            self.config = Some(config);
            self
        }

        /// Registers a strategy with risk level 3 and no initial APY estimate.
        /// The first one becomes current.
        pub fn strategy(self, id: &str, report: StrategyReport) -> Self {
            self.rated_strategy(id, 3, 0, report)
        }

        pub fn rated_strategy(
            mut self,
            id: &str,
            risk_level: u8,
            apy_bps: i64,
            report: StrategyReport,
        ) -> Self {
            self.strategies.push(StrategySpec {
                id: id.to_string(),
                risk_level,
                apy_bps,
                report,
            });
            self
        }

        /// Mints shares to `account` without backing assets.
        pub fn shares(mut self, account: &str, n: u128) -> Self {
            self.shares.push((account.to_string(), n));
            self
        }

        pub fn idle_assets(mut self, n: u128) -> Self {
            self.idle_assets = n;
            self
        }

        /// Sets the predecessor (caller) account for subsequent calls.
        pub fn predecessor(mut self, id: &str) -> Self {
            self.predecessor = Some(id.to_string());
            self
        }

        /// Sets the attached deposit in yoctoNEAR.
        pub fn attached(mut self, yocto: u128) -> Self {
            self.attached = yocto;
            self
        }

        pub fn build(self) -> Contract {
            init_ctx(&self.owner, 0);
            let meta = FungibleTokenMetadata {
                spec: "ft-1.0.0".into(),
                name: "USDC Strategy Vault Shares".into(),
                symbol: "svUSDC".into(),
                icon: None,
                reference: None,
                reference_hash: None,
                decimals: 6,
            };
            let mut c = Contract::init(
                self.owner.parse().unwrap(),
                self.asset.parse().unwrap(),
                meta,
                self.controller.map(|id| id.parse().unwrap()),
                self.config,
            );
            for spec in self.strategies {
                c.register_strategy(spec.id, spec.risk_level, spec.apy_bps, spec.report)
                    .unwrap();
            }
            for (account, n) in self.shares {
                let account = account.parse().unwrap();
                c.internal_register_if_needed(&account);
                c.token.internal_deposit(&account, n);
            }
            c.idle_assets = self.idle_assets;
            if let Some(p) = &self.predecessor {
                init_ctx(p, self.attached);
            }
            c
        }
    }
}
