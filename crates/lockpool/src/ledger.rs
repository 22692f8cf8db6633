//! Ledger facade: owns the registry, the custody vaults and the composite
//! providers, and dispatches every public operation over the closed
//! [`ProviderKind`] set.
//!
//! Operations are serialized and fail closed: validation first, fallible
//! custody movement next, parameter updates last. Transferring a pool to the
//! registry is the withdrawal trigger; transferring with split instructions
//! attached is the split trigger.

use log::info;

use crate::error::{LedgerError, LedgerResult};
use crate::provider::{base, CollateralPoolIds, CollateralProvider, DelayVaultProvider, Tier};
use crate::registry::{PoolRegistry, PoolSplit};
use crate::types::{
    Address, Amount, Caller, PoolData, PoolId, ProviderKind, Timestamp, VaultId, MAX_RATIO,
};
use crate::vault::VaultManager;

/// Construction parameters for the composite providers.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Base strategy backing the collateral delegate pools.
    pub collateral_delegate: ProviderKind,
    /// The single asset the delay vault accepts.
    pub delay_vault_token: Address,
    /// Tier table, ascending by limit.
    pub delay_vault_tiers: Vec<Tier>,
}

/// Result of a withdrawal trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// Amount released (paid out, or routed for a delay pool).
    pub withdrawn: Amount,
    /// Whether the pool is fully consumed.
    pub is_final: bool,
    /// The pool the amount was re-registered under, for delay pools.
    pub routed_pool: Option<PoolId>,
}

pub struct Ledger {
    registry: PoolRegistry,
    vaults: VaultManager,
    collateral: CollateralProvider,
    delay_vault: DelayVaultProvider,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        Ok(Self {
            registry: PoolRegistry::new(),
            vaults: VaultManager::new(),
            collateral: CollateralProvider::new(config.collateral_delegate)?,
            delay_vault: DelayVaultProvider::new(
                config.delay_vault_token,
                config.delay_vault_tiers,
            )?,
        })
    }

    fn ensure_owner(&self, caller: Address, pool_id: PoolId) -> LedgerResult<()> {
        if self.registry.owner_of(pool_id)? != caller {
            return Err(LedgerError::UnauthorizedCaller(pool_id));
        }
        Ok(())
    }

    // ---- creation -------------------------------------------------------

    /// Create a pool under a base strategy over an existing vault. Funding
    /// the vault is the caller's concern.
    pub fn create_base_pool(
        &mut self,
        kind: ProviderKind,
        owner: Address,
        token: Address,
        vault_id: VaultId,
        params: &[Amount],
        now: Timestamp,
    ) -> LedgerResult<PoolId> {
        base::create_pool(&mut self.registry, kind, owner, token, vault_id, params, now)
    }

    /// Deposit `amount` of `token` into a fresh vault and create a base pool
    /// over it in one step.
    pub fn deposit_and_create(
        &mut self,
        kind: ProviderKind,
        owner: Address,
        token: Address,
        params: &[Amount],
        now: Timestamp,
    ) -> LedgerResult<PoolId> {
        if params.is_empty() {
            return Err(LedgerError::InvalidParams("missing amount"));
        }
        let vault_id = self.vaults.deposit(token, params[0]);
        base::create_pool(&mut self.registry, kind, owner, token, vault_id, params, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_collateral_pool(
        &mut self,
        owner: Address,
        main_coin: Address,
        token: Address,
        token_amount: Amount,
        main_coin_amount: Amount,
        finish_time: Timestamp,
        signature: &[u8],
        now: Timestamp,
    ) -> LedgerResult<CollateralPoolIds> {
        self.collateral.create_pool(
            &mut self.registry,
            &mut self.vaults,
            owner,
            main_coin,
            token,
            token_amount,
            main_coin_amount,
            finish_time,
            signature,
            now,
        )
    }

    pub fn create_delay_vault(
        &mut self,
        owner: Address,
        amount: Amount,
    ) -> LedgerResult<PoolId> {
        self.delay_vault
            .create_pool(&mut self.registry, &mut self.vaults, owner, amount)
    }

    // ---- collateral settlement ------------------------------------------

    /// Counterparty bought tokens; release the matching main coin share into
    /// the collector. Returns the main coin moved.
    pub fn handle_withdraw(
        &mut self,
        pool_id: PoolId,
        token_amount: Amount,
    ) -> LedgerResult<Amount> {
        self.collateral
            .handle_withdraw(&mut self.registry, pool_id, token_amount)
    }

    /// Counterparty refunded tokens; pay the matching main coin share to
    /// `payer` out of the deal vault. Returns the main coin paid.
    pub fn handle_refund(
        &mut self,
        pool_id: PoolId,
        payer: Address,
        token_amount: Amount,
    ) -> LedgerResult<Amount> {
        self.collateral
            .handle_refund(&mut self.registry, &mut self.vaults, pool_id, payer, token_amount)
    }

    // ---- triggers --------------------------------------------------------

    /// Transferring a pool to the registry triggers a withdrawal. Only the
    /// pool owner may trigger; the owning provider's callback then runs with
    /// the registry identity.
    pub fn transfer_to_registry(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        now: Timestamp,
    ) -> LedgerResult<WithdrawOutcome> {
        self.ensure_owner(caller, pool_id)?;
        let kind = self.registry.pool(pool_id)?.provider;
        info!("ledger: pool {pool_id} transferred to the registry (withdraw)");
        match kind {
            ProviderKind::Deal | ProviderKind::Lock | ProviderKind::Timed => {
                let (withdrawn, is_final) = base::on_withdraw(
                    &mut self.registry,
                    &mut self.vaults,
                    Caller::Registry,
                    pool_id,
                    now,
                )?;
                Ok(WithdrawOutcome { withdrawn, is_final, routed_pool: None })
            }
            ProviderKind::Collateral => {
                let (withdrawn, is_final) = self.collateral.on_withdraw(
                    &mut self.registry,
                    &mut self.vaults,
                    Caller::Registry,
                    pool_id,
                    now,
                )?;
                Ok(WithdrawOutcome { withdrawn, is_final, routed_pool: None })
            }
            ProviderKind::DelayVault => {
                let (routed, withdrawn) = self.delay_vault.on_withdraw(
                    &mut self.registry,
                    Caller::Registry,
                    pool_id,
                    now,
                )?;
                Ok(WithdrawOutcome {
                    withdrawn,
                    is_final: true,
                    routed_pool: Some(routed),
                })
            }
        }
    }

    /// Transferring a pool to the registry with split instructions attached
    /// triggers a split. Records and returns the completion signal.
    pub fn transfer_to_registry_with_split(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        ratio: Amount,
        new_owner: Address,
    ) -> LedgerResult<PoolSplit> {
        self.ensure_owner(caller, pool_id)?;
        if ratio == 0 || ratio > MAX_RATIO {
            return Err(LedgerError::InvalidParams("ratio out of range"));
        }
        if new_owner.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let kind = self.registry.pool(pool_id)?.provider;
        let (new_pool_id, keep, carve) = match kind {
            ProviderKind::Deal | ProviderKind::Lock | ProviderKind::Timed => {
                let (id, split) = base::on_split(
                    &mut self.registry,
                    Caller::Registry,
                    pool_id,
                    ratio,
                    new_owner,
                )?;
                (id, split.keep, split.carve)
            }
            ProviderKind::Collateral => self.collateral.on_split(
                &mut self.registry,
                Caller::Registry,
                pool_id,
                ratio,
                new_owner,
            )?,
            ProviderKind::DelayVault => {
                let (id, split) = self.delay_vault.on_split(
                    &mut self.registry,
                    Caller::Registry,
                    pool_id,
                    ratio,
                    new_owner,
                )?;
                (id, split.keep, split.carve)
            }
        };
        let split = PoolSplit {
            pool_id,
            new_pool_id,
            owner: caller,
            new_owner,
            split_left_amount: keep,
            new_split_left_amount: carve,
        };
        self.registry.record_split(split.clone());
        Ok(split)
    }

    // ---- read surface -----------------------------------------------------

    pub fn withdrawable_amount(&self, pool_id: PoolId, now: Timestamp) -> LedgerResult<Amount> {
        let pool = self.registry.pool(pool_id)?;
        match pool.provider {
            ProviderKind::Deal | ProviderKind::Lock | ProviderKind::Timed => {
                Ok(base::withdrawable_amount(pool, now))
            }
            ProviderKind::Collateral => {
                self.collateral
                    .withdrawable_amount(&self.registry, pool_id, now)
            }
            ProviderKind::DelayVault => {
                self.delay_vault.withdrawable_amount(&self.registry, pool_id)
            }
        }
    }

    pub fn data(&self, pool_id: PoolId) -> LedgerResult<PoolData> {
        self.registry.data(pool_id)
    }

    /// A collateral pool reports itself plus its three delegates in creation
    /// order; every other pool reports itself alone.
    pub fn full_data(&self, pool_id: PoolId) -> LedgerResult<Vec<PoolData>> {
        let pool = self.registry.pool(pool_id)?;
        if pool.provider != ProviderKind::Collateral {
            return Ok(vec![self.registry.data(pool_id)?]);
        }
        let ids = CollateralPoolIds::of(pool_id);
        Ok(vec![
            self.registry.data(ids.collateral)?,
            self.registry.data(ids.main_coin_collector)?,
            self.registry.data(ids.token_collector)?,
            self.registry.data(ids.main_coin_holder)?,
        ])
    }

    pub fn total_supply(&self) -> u64 {
        self.registry.total_supply()
    }

    pub fn owner_of(&self, pool_id: PoolId) -> LedgerResult<Address> {
        self.registry.owner_of(pool_id)
    }

    pub fn splits(&self) -> &[PoolSplit] {
        self.registry.splits()
    }

    pub fn vault_balance(&self, vault_id: VaultId) -> Amount {
        self.vaults.balance(vault_id)
    }

    pub fn transfers(&self) -> &[crate::vault::Transfer] {
        self.vaults.transfers()
    }

    /// Total delayed amount currently held for `owner`.
    pub fn user_amount(&self, owner: Address) -> Amount {
        self.delay_vault.user_amount(owner)
    }

    /// Tier the owner's next delay-vault withdrawal would resolve to.
    pub fn user_tier(&self, owner: Address) -> usize {
        self.delay_vault.tier_index(self.delay_vault.user_amount(owner))
    }
}
