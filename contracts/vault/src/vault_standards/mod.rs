//! # Vault Standards Module
//!
//! Share accounting primitives shared by the ledger and the strategies.
//!
//! ## Module Organization
//!
//! - [`core`]: The vault's share/asset query interface
//! - [`events`]: `EVENT_JSON` logging of vault activity
//! - [`internal`]: Share/asset conversions and payout execution
//! - [`mul_div`]: Safe multiplication and division with configurable rounding

pub mod core;
pub mod events;
pub mod internal;
pub mod mul_div;

pub use core::*;
