//! Provider strategies.
//!
//! `base` holds the three leaf unlock schedules; `collateral` and
//! `delay_vault` are composites built on top of them. Dispatch over the
//! closed [`crate::types::ProviderKind`] set lives in the ledger facade.

pub mod base;
pub mod collateral;
pub mod delay_vault;

pub use collateral::{CollateralPoolIds, CollateralProvider};
pub use delay_vault::{DelayVaultProvider, Tier};
