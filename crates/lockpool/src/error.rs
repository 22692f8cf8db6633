//! Error taxonomy for ledger operations.
//!
//! All validation happens at the start of an operation; an error means the
//! operation had no effect on registry, custody or provider state.

use thiserror::Error;

use crate::types::{Amount, PoolId, VaultId};

/// Ledger operation result.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A real provider or account identity was required.
    #[error("invalid address")]
    InvalidAddress,

    /// Finish time not strictly after creation/start time.
    #[error("finish time must be in the future")]
    InvalidSchedule,

    /// Withdraw/split callbacks may only be dispatched by the registry.
    #[error("only the registry can call this function")]
    Unauthorized,

    /// Owner-only entry point reached by someone who is not the owner.
    #[error("caller does not own pool {0}")]
    UnauthorizedCaller(PoolId),

    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    #[error("unknown vault {0}")]
    UnknownVault(VaultId),

    /// Parameter sequence does not match the provider schema.
    #[error("invalid params: {0}")]
    InvalidParams(&'static str),

    /// Custody movement would overdraw the vault. The operation is rejected
    /// whole; no partial application.
    #[error("vault {vault_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        vault_id: VaultId,
        requested: Amount,
        available: Amount,
    },
}
