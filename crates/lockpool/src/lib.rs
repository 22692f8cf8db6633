//! Tokenized, position-splitting ledger for deal and vesting arrangements.
//!
//! Ownership of a locked value stream is represented by a pool record whose
//! unlock behavior is delegated to a provider strategy. The registry is the
//! directory and dispatcher: it allocates sequential pool ids and routes
//! ownership-transfer-to-registry events back into the owning provider as a
//! withdraw or split. Custody lives in a separate vault ledger.
//!
//! Core invariants:
//! - A pool's parameter sequence is only mutated by its owning provider.
//! - Splits conserve value exactly: `keep + carve == before`, with any
//!   floor-division rounding loss staying with the original pool.
//! - A drained pool keeps a zero remaining amount forever; records are never
//!   removed.
//! - Withdraw/split callbacks are registry-only entry points.

pub mod error;
pub mod ledger;
pub mod math;
pub mod provider;
pub mod registry;
pub mod types;
pub mod vault;

pub use error::*;
pub use ledger::*;
pub use provider::{CollateralPoolIds, CollateralProvider, DelayVaultProvider, Tier};
pub use registry::*;
pub use types::*;
pub use vault::*;
