//! Pool directory: sequential id allocation and per-pool records.
//!
//! The registry never interprets parameters; those belong to the owning
//! provider, and mutation is gated on the provider tag. It also keeps the
//! split completion log.

use log::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Address, Amount, Params, PoolData, PoolId, ProviderKind, VaultId};

/// One pool record. Never removed; a fully drained pool carries a zero
/// remaining amount forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub id: PoolId,
    pub provider: ProviderKind,
    pub owner: Address,
    pub token: Address,
    pub vault_id: VaultId,
    pub params: Params,
}

/// Completion signal emitted after a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSplit {
    pub pool_id: PoolId,
    pub new_pool_id: PoolId,
    pub owner: Address,
    pub new_owner: Address,
    /// Remaining amount on the original pool after the split.
    pub split_left_amount: Amount,
    /// Amount carved out into the new pool.
    pub new_split_left_amount: Amount,
}

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
    splits: Vec<PoolSplit>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pools ever registered. The next allocated id equals this.
    pub fn total_supply(&self) -> u64 {
        self.pools.len() as u64
    }

    /// Allocate the next sequential pool id and record the pool. A provider
    /// creating several pools in one operation gets a contiguous id range.
    pub fn register_pool(
        &mut self,
        provider: ProviderKind,
        owner: Address,
        token: Address,
        vault_id: VaultId,
        params: Params,
    ) -> PoolId {
        let pool_id = self.pools.len() as PoolId;
        debug!(
            "registry: pool {pool_id} registered under {} for {owner:?}",
            provider.name()
        );
        self.pools.push(Pool {
            id: pool_id,
            provider,
            owner,
            token,
            vault_id,
            params,
        });
        pool_id
    }

    pub fn pool(&self, pool_id: PoolId) -> LedgerResult<&Pool> {
        self.pools
            .get(pool_id as usize)
            .ok_or(LedgerError::UnknownPool(pool_id))
    }

    pub fn owner_of(&self, pool_id: PoolId) -> LedgerResult<Address> {
        Ok(self.pool(pool_id)?.owner)
    }

    /// Mutable parameter access, restricted to the owning provider.
    pub fn params_mut(&mut self, pool_id: PoolId, by: ProviderKind) -> LedgerResult<&mut Params> {
        let pool = self
            .pools
            .get_mut(pool_id as usize)
            .ok_or(LedgerError::UnknownPool(pool_id))?;
        if pool.provider != by {
            return Err(LedgerError::Unauthorized);
        }
        Ok(&mut pool.params)
    }

    /// Read snapshot of one pool.
    pub fn data(&self, pool_id: PoolId) -> LedgerResult<PoolData> {
        let pool = self.pool(pool_id)?;
        Ok(PoolData {
            provider: pool.provider,
            name: pool.provider.name(),
            pool_id: pool.id,
            vault_id: pool.vault_id,
            owner: pool.owner,
            token: pool.token,
            params: pool.params.clone(),
        })
    }

    pub fn record_split(&mut self, split: PoolSplit) {
        debug!(
            "registry: pool {} split, new pool {} ({} / {})",
            split.pool_id, split.new_pool_id, split.split_left_amount, split.new_split_left_amount
        );
        self.splits.push(split);
    }

    /// Split completion log, oldest first.
    pub fn splits(&self) -> &[PoolSplit] {
        &self.splits
    }
}
