//! # Access Control
//!
//! Two roles gate the mutating surface of the vault:
//!
//! - `Owner`: pause/unpause, strategy registry, configuration, emergency withdraw
//! - `StrategyController`: keeper reports and rebalancing
//!
//! The owner implicitly holds controller rights. The role checks are pure
//! functions of [`AccessControl`] and the caller, so they are testable without
//! a runtime context.

use near_sdk::{env, near, AccountId};

use crate::error::VaultError;
use crate::{Contract, ContractExt};

/// A privileged role.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Owner,
    StrategyController,
}

/// Role assignments of the vault.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessControl {
    pub owner_id: AccountId,
    pub strategy_controller: Option<AccountId>,
}

impl AccessControl {
    pub fn new(owner_id: AccountId, strategy_controller: Option<AccountId>) -> Self {
        Self {
            owner_id,
            strategy_controller,
        }
    }

    pub fn has_role(&self, role: Role, account: &AccountId) -> bool {
        if *account == self.owner_id {
            return true;
        }
        match role {
            Role::Owner => false,
            Role::StrategyController => self.strategy_controller.as_ref() == Some(account),
        }
    }

    /// Fails with [`VaultError::Unauthorized`] unless `account` holds `role`.
    pub fn require(&self, role: Role, account: &AccountId) -> Result<(), VaultError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized {
                account: account.clone(),
                role,
            })
        }
    }
}

impl Contract {
    /// Checks the predecessor against `role` and returns it on success.
    pub(crate) fn require_role(&self, role: Role) -> Result<AccountId, VaultError> {
        let caller = env::predecessor_account_id();
        self.access.require(role, &caller)?;
        Ok(caller)
    }
}

#[near]
impl Contract {
    /// Assigns (or with `None`, revokes) the strategy controller role.
    #[handle_result]
    pub fn set_strategy_controller(
        &mut self,
        controller_id: Option<AccountId>,
    ) -> Result<(), VaultError> {
        self.require_role(Role::Owner)?;
        env::log_str(&format!(
            "set_strategy_controller: previous={:?} next={:?}",
            self.access.strategy_controller, controller_id
        ));
        self.access.strategy_controller = controller_id;
        Ok(())
    }

    // ==================== View Methods ====================

    pub fn get_access_control(&self) -> AccessControl {
        self.access.clone()
    }
}
