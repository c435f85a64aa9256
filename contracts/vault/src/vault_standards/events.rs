//! # Vault Events
//!
//! Every entry appended to the activity log is also emitted as a JSON log line
//! prefixed with `EVENT_JSON:`, following the NEP-297 event format.
//!
//! ## Format
//!
//! ```json
//! {
//!   "standard": "strategy_vault",
//!   "version": "1.0.0",
//!   "event": "deposit",
//!   "data": { ... }
//! }
//! ```
//!
//! Share mints and burns are additionally reported through the NEP-141
//! `FtMint`/`FtBurn` events of `near-contract-standards`.

use near_sdk::env;
use near_sdk::serde::Serialize;

use crate::activity::VaultActivity;

/// Version of the `strategy_vault` event standard.
pub const EVENT_VERSION: &str = "1.0.0";

// ============================================================================
// Event Wrapper
// ============================================================================

/// Top-level event wrapper.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
#[serde(tag = "standard")]
#[must_use = "don't forget to `.emit()` this event"]
#[serde(rename_all = "snake_case")]
pub(crate) enum NearEvent<'a> {
    StrategyVault(StrategyVaultEvent<'a>),
}

impl<'a> NearEvent<'a> {
    fn to_json_string(&self) -> String {
        #[allow(clippy::redundant_closure)]
        serde_json::to_string(self)
            .ok()
            .unwrap_or_else(|| env::abort())
    }

    fn to_json_event_string(&self) -> String {
        format!("EVENT_JSON:{}", self.to_json_string())
    }

    /// Logs the event to the NEAR runtime.
    pub(crate) fn emit(self) {
        env::log_str(&self.to_json_event_string());
    }
}

/// Versioned payload; `activity` supplies the `event` and `data` keys.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub(crate) struct StrategyVaultEvent<'a> {
    version: &'static str,
    #[serde(flatten)]
    activity: &'a VaultActivity,
}

/// Emits `activity` as a `strategy_vault` event.
pub(crate) fn emit_activity(activity: &VaultActivity) {
    NearEvent::StrategyVault(StrategyVaultEvent {
        version: EVENT_VERSION,
        activity,
    })
    .emit()
}
