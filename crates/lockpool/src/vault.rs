//! Custody ledger: one balance per vault id.
//!
//! Pure deposit/withdraw bookkeeping, no business logic. Multiple pools may
//! reference the same vault id; providers only move amounts their own
//! accounting entitles them to, and every withdrawal fails closed.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Address, Amount, VaultId};

/// A single custody vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAccount {
    pub token: Address,
    pub balance: Amount,
}

/// Record of an outbound custody transfer, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub vault_id: VaultId,
    pub recipient: Address,
    pub amount: Amount,
}

/// In-memory custody ledger. Vault ids start at 1; id 0 is reserved for
/// "no custody attached" and never exists here.
#[derive(Debug)]
pub struct VaultManager {
    vaults: BTreeMap<VaultId, VaultAccount>,
    next_id: VaultId,
    transfers: Vec<Transfer>,
}

impl VaultManager {
    pub fn new() -> Self {
        Self {
            vaults: BTreeMap::new(),
            next_id: 1,
            transfers: Vec::new(),
        }
    }

    /// Open a new vault funded with `amount` of `token`. One vault per
    /// deposit batch; returns the freshly allocated id.
    pub fn deposit(&mut self, token: Address, amount: Amount) -> VaultId {
        let vault_id = self.next_id;
        self.next_id += 1;
        self.vaults.insert(vault_id, VaultAccount { token, balance: amount });
        debug!("vault {vault_id}: opened with deposit of {amount}");
        vault_id
    }

    /// Top up an existing vault.
    pub fn deposit_to(&mut self, vault_id: VaultId, amount: Amount) -> LedgerResult<()> {
        let vault = self
            .vaults
            .get_mut(&vault_id)
            .ok_or(LedgerError::UnknownVault(vault_id))?;
        vault.balance = vault.balance.saturating_add(amount);
        debug!("vault {vault_id}: deposit of {amount}");
        Ok(())
    }

    /// Move `amount` out of the vault to `recipient`. Zero-amount moves are
    /// a no-op; an overdraw rejects the whole call.
    pub fn withdraw(
        &mut self,
        vault_id: VaultId,
        recipient: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let vault = self
            .vaults
            .get_mut(&vault_id)
            .ok_or(LedgerError::UnknownVault(vault_id))?;
        if vault.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                vault_id,
                requested: amount,
                available: vault.balance,
            });
        }
        vault.balance -= amount;
        debug!("vault {vault_id}: withdrew {amount}");
        self.transfers.push(Transfer {
            vault_id,
            recipient,
            amount,
        });
        Ok(())
    }

    pub fn balance(&self, vault_id: VaultId) -> Amount {
        self.vaults.get(&vault_id).map_or(0, |v| v.balance)
    }

    pub fn token(&self, vault_id: VaultId) -> Option<Address> {
        self.vaults.get(&vault_id).map(|v| v.token)
    }

    /// Id of the most recently opened vault; 0 when none exist yet.
    pub fn last_vault_id(&self) -> VaultId {
        self.next_id - 1
    }

    /// Outbound transfer log, oldest first.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }
}

impl Default for VaultManager {
    fn default() -> Self {
        Self::new()
    }
}
