//! Delay vault: a tier router in front of the base strategies.
//!
//! Users deposit a single token into delay pools. On withdrawal the pool is
//! not paid out directly; the amount is re-registered under the base strategy
//! of the user's tier, with the tier's schedule offsets anchored at the
//! withdrawal time. Tier resolution uses the owner's total delayed amount
//! across all their delay pools, not the single pool being withdrawn.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::math;
use crate::provider::base;
use crate::registry::PoolRegistry;
use crate::types::{Address, Amount, Caller, Params, PoolId, ProviderKind, Timestamp};
use crate::vault::VaultManager;

/// One tier: amounts up to `limit` route to `kind` with the given schedule
/// offsets (seconds relative to the withdrawal time).
///
/// Offsets follow the schema of the target strategy minus the amount cell:
/// none for an immediate payout, `[start]` for a cliff, `[start, finish]`
/// for a linear schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub kind: ProviderKind,
    pub limit: Amount,
    pub offsets: Params,
}

impl Tier {
    pub fn new(kind: ProviderKind, limit: Amount, offsets: &[Amount]) -> Self {
        Self {
            kind,
            limit,
            offsets: offsets.iter().copied().collect(),
        }
    }

    fn expected_offsets(kind: ProviderKind) -> usize {
        match kind {
            ProviderKind::Deal => 0,
            ProviderKind::Lock => 1,
            ProviderKind::Timed => 2,
            _ => usize::MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DelayVaultProvider {
    token: Address,
    tiers: Vec<Tier>,
    /// Total delayed amount per owner, the sole input to tier resolution.
    user_amount: BTreeMap<Address, Amount>,
}

impl DelayVaultProvider {
    /// Tiers must route to base strategies, carry matching offset arity
    /// (strictly positive and ascending, so every routed schedule starts in
    /// the future) and ascend by limit. The last tier is the catch-all; its
    /// limit is forced to the maximum so every amount resolves.
    pub fn new(token: Address, mut tiers: Vec<Tier>) -> LedgerResult<Self> {
        if token.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        if tiers.is_empty() {
            return Err(LedgerError::InvalidParams("at least one tier required"));
        }
        for tier in &tiers {
            if !tier.kind.is_base() {
                return Err(LedgerError::InvalidParams("tier must route to a base strategy"));
            }
            if tier.offsets.len() != Tier::expected_offsets(tier.kind) {
                return Err(LedgerError::InvalidParams("tier offset arity mismatch"));
            }
            if tier.offsets.first() == Some(&0) {
                return Err(LedgerError::InvalidParams("tier offsets must be positive"));
            }
            if tier.offsets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(LedgerError::InvalidParams("tier offsets must ascend"));
            }
        }
        if tiers.windows(2).any(|w| w[0].limit >= w[1].limit) {
            return Err(LedgerError::InvalidParams("tier limits must ascend"));
        }
        if let Some(last) = tiers.last_mut() {
            last.limit = Amount::MAX;
        }
        Ok(Self {
            token,
            tiers,
            user_amount: BTreeMap::new(),
        })
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Total delayed amount currently held for `owner`.
    pub fn user_amount(&self, owner: Address) -> Amount {
        self.user_amount.get(&owner).copied().unwrap_or(0)
    }

    /// First tier whose limit covers `amount`. Always resolves; the last
    /// tier's limit is the maximum.
    pub fn tier_index(&self, amount: Amount) -> usize {
        self.tiers
            .iter()
            .position(|t| t.limit >= amount)
            .unwrap_or(self.tiers.len() - 1)
    }

    /// Deposit `amount` into a fresh vault and a fresh delay pool for
    /// `owner`. One vault per deposit; the routed pool inherits it later.
    pub fn create_pool(
        &mut self,
        registry: &mut PoolRegistry,
        vaults: &mut VaultManager,
        owner: Address,
        amount: Amount,
    ) -> LedgerResult<PoolId> {
        if owner.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        if amount == 0 {
            return Err(LedgerError::InvalidParams("amount must be non-zero"));
        }
        let vault_id = vaults.deposit(self.token, amount);
        let mut params = Params::new();
        params.push(amount);
        let pool_id =
            registry.register_pool(ProviderKind::DelayVault, owner, self.token, vault_id, params);
        let total = self.user_amount.entry(owner).or_insert(0);
        *total = total.saturating_add(amount);
        info!("delay vault: pool {pool_id} opened with {amount}, owner total {total}");
        Ok(pool_id)
    }

    /// The whole remaining amount is always claimable; claiming starts the
    /// tier schedule rather than paying out.
    pub fn withdrawable_amount(
        &self,
        registry: &PoolRegistry,
        pool_id: PoolId,
    ) -> LedgerResult<Amount> {
        let pool = registry.pool(pool_id)?;
        if pool.provider != ProviderKind::DelayVault {
            return Err(LedgerError::InvalidParams("not a delay vault pool"));
        }
        Ok(pool.params[0])
    }

    /// Registry-dispatched withdrawal: drain the delay pool into a new pool
    /// minted through the tier strategy's own creation path, schedule
    /// anchored at `now`. Custody stays in the deposit's vault until the
    /// target pool itself pays out. Returns the new pool id and the routed
    /// amount; the delay pool is always final, and an already drained pool
    /// cannot route again.
    pub fn on_withdraw(
        &mut self,
        registry: &mut PoolRegistry,
        caller: Caller,
        pool_id: PoolId,
        now: Timestamp,
    ) -> LedgerResult<(PoolId, Amount)> {
        if caller != Caller::Registry {
            return Err(LedgerError::Unauthorized);
        }
        let amount = self.withdrawable_amount(registry, pool_id)?;
        if amount == 0 {
            return Err(LedgerError::InvalidParams("delay pool already drained"));
        }
        let pool = registry.pool(pool_id)?;
        let owner = pool.owner;
        let vault_id = pool.vault_id;

        let tier = &self.tiers[self.tier_index(self.user_amount(owner))];
        let anchor = Amount::from(now);
        let mut params = Params::new();
        params.push(amount);
        for offset in &tier.offsets {
            params.push(anchor + offset);
        }
        if tier.kind == ProviderKind::Timed {
            params.push(amount);
        }
        let target = base::create_pool(
            registry,
            tier.kind,
            owner,
            self.token,
            vault_id,
            params.as_slice(),
            now,
        )?;

        registry.params_mut(pool_id, ProviderKind::DelayVault)?[0] = 0;
        let total = self.user_amount.entry(owner).or_insert(0);
        *total = total.saturating_sub(amount);
        info!(
            "delay vault: pool {pool_id} routed {amount} into {} pool {target}",
            tier.kind.name()
        );
        Ok((target, amount))
    }

    /// Registry-dispatched split. Both sides stay delay pools; the carve
    /// moves between the owners' running totals so each side's tier reflects
    /// what that owner actually holds.
    pub fn on_split(
        &mut self,
        registry: &mut PoolRegistry,
        caller: Caller,
        pool_id: PoolId,
        ratio: Amount,
        new_owner: Address,
    ) -> LedgerResult<(PoolId, math::SplitAmounts)> {
        if caller != Caller::Registry {
            return Err(LedgerError::Unauthorized);
        }
        let pool = registry.pool(pool_id)?;
        if pool.provider != ProviderKind::DelayVault {
            return Err(LedgerError::InvalidParams("not a delay vault pool"));
        }
        let owner = pool.owner;
        let vault_id = pool.vault_id;
        let split = math::split_amount(pool.params[0], ratio);

        registry.params_mut(pool_id, ProviderKind::DelayVault)?[0] = split.keep;
        let mut new_params = Params::new();
        new_params.push(split.carve);
        let new_pool_id = registry.register_pool(
            ProviderKind::DelayVault,
            new_owner,
            self.token,
            vault_id,
            new_params,
        );
        if new_owner != owner {
            let from = self.user_amount.entry(owner).or_insert(0);
            *from = from.saturating_sub(split.carve);
            let to = self.user_amount.entry(new_owner).or_insert(0);
            *to = to.saturating_add(split.carve);
        }
        debug!(
            "delay vault: pool {pool_id} split into {new_pool_id} ({} / {})",
            split.keep, split.carve
        );
        Ok((new_pool_id, split))
    }
}
