//! # Vault Errors
//!
//! Every fallible vault operation returns [`VaultError`]. Public contract
//! methods are annotated with `#[handle_result]`, so an `Err` aborts the
//! receipt with the error's `Display` text and all state changes made by the
//! call are reverted by the runtime.
//!
//! Failures of an external venue are described by [`VenueError`] and reach the
//! caller wrapped in [`VaultError::AdapterUnavailable`].

use std::fmt;

use near_sdk::{env, AccountId, FunctionError};

use crate::access::Role;
use crate::registry::StrategyId;

/// Taxonomy bucket of a [`VaultError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, missing authorization or a violated precondition.
    Validation,
    /// The external venue behind an adapter failed. Retryable.
    AdapterUnavailable,
    /// An adapter reported `is_healthy() == false` where health is required.
    HealthDegraded,
    /// A rebalance escrow is pending. Retryable once it is resolved.
    RebalanceInProgress,
}

/// Failure reported by a venue position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VenueError {
    /// The venue did not answer at its last keeper report.
    Unreachable,
    /// New supply is paused, frozen or capped at the venue.
    SupplyPaused,
    /// Withdrawals are paused at the venue.
    WithdrawPaused,
    /// The venue does not hold enough free liquidity for the request.
    InsufficientLiquidity { requested: u128, available: u128 },
    /// The vault's position at the venue is worth less than the request.
    InsufficientPosition { requested: u128, available: u128 },
    /// The venue's supply cap would be exceeded.
    SupplyCapReached { cap: u128 },
    /// The request converts to zero native units.
    ZeroOutput,
    /// A position or venue counter would overflow.
    Overflow,
    /// A keeper report was addressed to a different venue kind.
    ReportMismatch,
    /// A keeper report carried an impossible value (e.g. a zero exchange rate).
    InvalidReport(&'static str),
}

impl fmt::Display for VenueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueError::Unreachable => write!(f, "venue unreachable"),
            VenueError::SupplyPaused => write!(f, "venue supply paused"),
            VenueError::WithdrawPaused => write!(f, "venue withdrawals paused"),
            VenueError::InsufficientLiquidity {
                requested,
                available,
            } => write!(
                f,
                "venue liquidity too low: requested {requested}, available {available}"
            ),
            VenueError::InsufficientPosition {
                requested,
                available,
            } => write!(
                f,
                "position too small: requested {requested}, available {available}"
            ),
            VenueError::SupplyCapReached { cap } => write!(f, "venue supply cap {cap} reached"),
            VenueError::ZeroOutput => write!(f, "amount converts to zero venue units"),
            VenueError::Overflow => write!(f, "venue counter overflow"),
            VenueError::ReportMismatch => write!(f, "report does not match venue kind"),
            VenueError::InvalidReport(field) => write!(f, "invalid report field {field}"),
        }
    }
}

/// Errors returned by vault operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VaultError {
    // ==================== Validation ====================
    /// The amount argument was zero.
    ZeroAmount,
    /// The deposit would mint zero shares.
    ZeroShares,
    /// Fewer shares would be minted than the depositor's `min_shares`.
    MinSharesNotMet { expected: u128, minted: u128 },
    /// Shares are outstanding but the pool holds no assets to price them.
    NoBackingAssets,
    /// The account holds fewer shares than requested.
    InsufficientShares { requested: u128, available: u128 },
    /// The account's recorded principal is smaller than requested.
    InsufficientPrincipal { requested: u128, available: u128 },
    /// The account's attributable yield is smaller than requested.
    InsufficientYield { requested: u128, available: u128 },
    /// The caller does not hold the required role.
    Unauthorized { account: AccountId, role: Role },
    /// The operation is not allowed while the vault is paused.
    Paused,
    /// `unpause` was called on an active vault.
    NotPaused,
    /// No strategy is registered under this id.
    UnknownStrategy(StrategyId),
    /// A strategy with this id already exists.
    StrategyAlreadyRegistered(StrategyId),
    /// The registry has no current strategy yet.
    NoCurrentStrategy,
    /// The strategy is deactivated and cannot receive funds.
    StrategyDeactivated(StrategyId),
    /// The named strategy is not the current one.
    NotCurrentStrategy(StrategyId),
    /// The current strategy cannot be deactivated.
    CannotDeactivateCurrent(StrategyId),
    /// Source and destination of a rebalance are the same strategy.
    SameStrategy,
    /// The previous rebalance is too recent.
    CooldownActive { remaining_ns: u64 },
    /// The destination does not beat the current score by the required margin.
    InsufficientImprovement { current_score: i128, candidate_score: i128 },
    /// No healthy candidate is available for an automatic rebalance.
    NoEligibleCandidate,
    /// The amount the source can deliver deviates from the expected amount.
    SlippageExceeded { expected: u128, available: u128 },
    /// No rebalance escrow is pending.
    NoEscrow,
    /// A configuration value is out of range.
    InvalidConfig(&'static str),
    /// An intermediate value overflowed.
    MathOverflow,

    // ==================== Health ====================
    /// The rebalance destination reported itself unhealthy.
    DestinationUnhealthy(StrategyId),

    // ==================== Adapter ====================
    /// The venue behind a strategy failed the call.
    AdapterUnavailable {
        strategy_id: StrategyId,
        reason: VenueError,
    },

    // ==================== Rebalance ====================
    /// A rebalance escrow must be resolved first.
    RebalanceInProgress,
}

impl VaultError {
    /// Classifies the error into the vault's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::AdapterUnavailable { .. } => ErrorKind::AdapterUnavailable,
            VaultError::DestinationUnhealthy(_) => ErrorKind::HealthDegraded,
            VaultError::RebalanceInProgress => ErrorKind::RebalanceInProgress,
            _ => ErrorKind::Validation,
        }
    }

    /// Whether the same call may succeed later without changing its input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AdapterUnavailable | ErrorKind::RebalanceInProgress
        ) || matches!(self, VaultError::CooldownActive { .. })
    }

    pub(crate) fn adapter(strategy_id: &str, reason: VenueError) -> Self {
        VaultError::AdapterUnavailable {
            strategy_id: strategy_id.to_string(),
            reason,
        }
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::ZeroAmount => write!(f, "Amount must be positive"),
            VaultError::ZeroShares => write!(f, "Deposit too small to mint shares"),
            VaultError::MinSharesNotMet { expected, minted } => {
                write!(f, "Minted {minted} shares, expected at least {expected}")
            }
            VaultError::NoBackingAssets => write!(f, "Vault has shares but no assets"),
            VaultError::InsufficientShares {
                requested,
                available,
            } => write!(f, "Insufficient shares: requested {requested}, available {available}"),
            VaultError::InsufficientPrincipal {
                requested,
                available,
            } => write!(
                f,
                "Insufficient principal: requested {requested}, available {available}"
            ),
            VaultError::InsufficientYield {
                requested,
                available,
            } => write!(f, "Insufficient yield: requested {requested}, available {available}"),
            VaultError::Unauthorized { account, role } => {
                write!(f, "{account} is not authorized as {role:?}")
            }
            VaultError::Paused => write!(f, "Vault is paused"),
            VaultError::NotPaused => write!(f, "Vault is not paused"),
            VaultError::UnknownStrategy(id) => write!(f, "Unknown strategy {id}"),
            VaultError::StrategyAlreadyRegistered(id) => {
                write!(f, "Strategy {id} is already registered")
            }
            VaultError::NoCurrentStrategy => write!(f, "No current strategy"),
            VaultError::StrategyDeactivated(id) => write!(f, "Strategy {id} is deactivated"),
            VaultError::NotCurrentStrategy(id) => write!(f, "Strategy {id} is not current"),
            VaultError::CannotDeactivateCurrent(id) => {
                write!(f, "Strategy {id} is current and cannot be deactivated")
            }
            VaultError::SameStrategy => write!(f, "Source and destination are the same"),
            VaultError::CooldownActive { remaining_ns } => {
                write!(f, "Rebalance cooldown active for another {remaining_ns} ns")
            }
            VaultError::InsufficientImprovement {
                current_score,
                candidate_score,
            } => write!(
                f,
                "Candidate score {candidate_score} does not improve enough on {current_score}"
            ),
            VaultError::NoEligibleCandidate => write!(f, "No healthy rebalance candidate"),
            VaultError::SlippageExceeded {
                expected,
                available,
            } => write!(
                f,
                "Slippage exceeded: expected {expected}, source delivers {available}"
            ),
            VaultError::NoEscrow => write!(f, "No rebalance escrow pending"),
            VaultError::InvalidConfig(field) => write!(f, "Invalid config: {field}"),
            VaultError::MathOverflow => write!(f, "Math overflow"),
            VaultError::DestinationUnhealthy(id) => {
                write!(f, "Strategy {id} is unhealthy and cannot receive funds")
            }
            VaultError::AdapterUnavailable {
                strategy_id,
                reason,
            } => write!(f, "Strategy {strategy_id} unavailable: {reason}"),
            VaultError::RebalanceInProgress => {
                write!(f, "Rebalance in progress, retry after escrow resolution")
            }
        }
    }
}

impl FunctionError for VaultError {
    fn panic(&self) -> ! {
        env::panic_str(&self.to_string())
    }
}
