//! Dual-asset collateral arrangement: four linked pools per deal.
//!
//! A project pledges `main_coin_amount` of the main coin against the
//! delivery of `token_amount` tokens. Layout, ids contiguous from creation:
//!
//! - N    collateral pool (owner-facing), params `[main_left, finish, ratio]`
//! - N+1  main coin collector (delegate, settled main coin)
//! - N+2  token collector (delegate, refunded tokens, no custody attached)
//! - N+3  main coin holder (delegate, the reserve still backing tokens)
//!
//! `ratio` is the main coin entitled per pledged token on the `MAX_RATIO`
//! scale. Settlement moves value from the holder into a collector and never
//! creates or destroys it: the collateral pool's `main_left` always equals
//! `collector.left + holder.left`.

use log::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::math;
use crate::provider::base;
use crate::registry::PoolRegistry;
use crate::types::{Address, Amount, Caller, Params, PoolId, ProviderKind, Timestamp};
use crate::vault::VaultManager;

/// Ids of the four linked pools of one deal, returned explicitly from
/// creation so callers never have to infer offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollateralPoolIds {
    pub collateral: PoolId,
    pub main_coin_collector: PoolId,
    pub token_collector: PoolId,
    pub main_coin_holder: PoolId,
}

impl CollateralPoolIds {
    /// Reconstruct the linked ids from the primary pool id.
    pub fn of(collateral: PoolId) -> Self {
        Self {
            collateral,
            main_coin_collector: collateral + 1,
            token_collector: collateral + 2,
            main_coin_holder: collateral + 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollateralProvider {
    delegate: ProviderKind,
}

impl CollateralProvider {
    /// `delegate` names the base strategy backing the three accounting
    /// pools. A composite kind here is the analog of a zero delegate
    /// address and is rejected.
    pub fn new(delegate: ProviderKind) -> LedgerResult<Self> {
        if !delegate.is_base() {
            return Err(LedgerError::InvalidAddress);
        }
        Ok(Self { delegate })
    }

    pub fn delegate(&self) -> ProviderKind {
        self.delegate
    }

    /// Create one deal: deposit the main coin pledge into a fresh vault and
    /// register the four linked pools.
    ///
    /// `signature` is carried for interface fidelity; verification is an
    /// external concern.
    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        &self,
        registry: &mut PoolRegistry,
        vaults: &mut VaultManager,
        owner: Address,
        main_coin: Address,
        token: Address,
        token_amount: Amount,
        main_coin_amount: Amount,
        finish_time: Timestamp,
        _signature: &[u8],
        now: Timestamp,
    ) -> LedgerResult<CollateralPoolIds> {
        if owner.is_zero() || main_coin.is_zero() || token.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        if finish_time <= now {
            return Err(LedgerError::InvalidSchedule);
        }
        if token_amount == 0 || main_coin_amount == 0 {
            return Err(LedgerError::InvalidParams("amounts must be non-zero"));
        }
        let ratio = math::ratio_of(main_coin_amount, token_amount);
        let vault_id = vaults.deposit(main_coin, main_coin_amount);
        let self_addr = ProviderKind::Collateral.address();

        let mut params = Params::new();
        params.push(main_coin_amount);
        params.push(Amount::from(finish_time));
        params.push(ratio);
        let collateral =
            registry.register_pool(ProviderKind::Collateral, owner, main_coin, vault_id, params);
        let main_coin_collector =
            base::register_delegate(registry, self.delegate, self_addr, main_coin, vault_id, 0)?;
        let token_collector =
            base::register_delegate(registry, self.delegate, self_addr, Address::ZERO, 0, 0)?;
        let main_coin_holder = base::register_delegate(
            registry,
            self.delegate,
            self_addr,
            main_coin,
            vault_id,
            main_coin_amount,
        )?;
        info!(
            "collateral: deal {collateral} created, pledge {main_coin_amount} against \
             {token_amount} tokens (ratio {ratio})"
        );
        Ok(CollateralPoolIds {
            collateral,
            main_coin_collector,
            token_collector,
            main_coin_holder,
        })
    }

    fn deal_params(
        &self,
        registry: &PoolRegistry,
        pool_id: PoolId,
    ) -> LedgerResult<(Amount, Amount, Amount)> {
        let pool = registry.pool(pool_id)?;
        if pool.provider != ProviderKind::Collateral {
            return Err(LedgerError::InvalidParams("not a collateral pool"));
        }
        Ok((pool.params[0], pool.params[1], pool.params[2]))
    }

    /// Settlement: the counterparty bought `token_amount` tokens, so the
    /// matching main coin share is released from the holder into the
    /// collector. Clamped to what the holder still has; repeated
    /// over-settlement moves only the remainder. Returns the main coin moved.
    pub fn handle_withdraw(
        &self,
        registry: &mut PoolRegistry,
        pool_id: PoolId,
        token_amount: Amount,
    ) -> LedgerResult<Amount> {
        let (_, _, ratio) = self.deal_params(registry, pool_id)?;
        let ids = CollateralPoolIds::of(pool_id);
        let holder_left = base::left_amount(registry, ids.main_coin_holder)?;
        let main = math::ratio_mul(token_amount, ratio).min(holder_left);
        base::withdraw_from(registry, ids.main_coin_holder, main)?;
        base::deposit_into(registry, ids.main_coin_collector, main)?;
        debug!("collateral: deal {pool_id} settled {main} main coin into the collector");
        Ok(main)
    }

    /// Settlement: the counterparty refunded `token_amount` tokens. The
    /// token collector is credited and the matching main coin share is paid
    /// out of the deal vault to `payer`, reducing the deal total. Clamped on
    /// the token side so both legs stay consistent when the holder runs
    /// short. Returns the main coin paid out.
    pub fn handle_refund(
        &self,
        registry: &mut PoolRegistry,
        vaults: &mut VaultManager,
        pool_id: PoolId,
        payer: Address,
        token_amount: Amount,
    ) -> LedgerResult<Amount> {
        if payer.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let (_, _, ratio) = self.deal_params(registry, pool_id)?;
        let vault_id = registry.pool(pool_id)?.vault_id;
        let ids = CollateralPoolIds::of(pool_id);
        let holder_left = base::left_amount(registry, ids.main_coin_holder)?;
        let token_credit = token_amount.min(math::ratio_div(holder_left, ratio));
        let main = math::ratio_mul(token_credit, ratio);

        // Custody out to the payer first; it is the only fallible step.
        vaults.withdraw(vault_id, payer, main)?;
        base::withdraw_from(registry, ids.main_coin_holder, main)?;
        base::deposit_into(registry, ids.token_collector, token_credit)?;
        let params = registry.params_mut(pool_id, ProviderKind::Collateral)?;
        params[0] -= main;
        debug!(
            "collateral: deal {pool_id} refunded {token_credit} tokens, {main} main coin to payer"
        );
        Ok(main)
    }

    /// Before `finish` only settled main coin in the collector is
    /// withdrawable; at/after `finish` the holder reserve is released too.
    pub fn withdrawable_amount(
        &self,
        registry: &PoolRegistry,
        pool_id: PoolId,
        now: Timestamp,
    ) -> LedgerResult<Amount> {
        let (_, finish, _) = self.deal_params(registry, pool_id)?;
        let ids = CollateralPoolIds::of(pool_id);
        let collector = base::left_amount(registry, ids.main_coin_collector)?;
        if Amount::from(now) >= finish {
            Ok(collector + base::left_amount(registry, ids.main_coin_holder)?)
        } else {
            Ok(collector)
        }
    }

    /// Registry-dispatched withdrawal. Drains the settled collectors (main
    /// coin paid to the owner, refunded tokens returned); the holder reserve
    /// is released only at/after `finish`; time alone never zeroes it.
    /// Returns `(main coin withdrawn, is_final)`.
    pub fn on_withdraw(
        &self,
        registry: &mut PoolRegistry,
        vaults: &mut VaultManager,
        caller: Caller,
        pool_id: PoolId,
        now: Timestamp,
    ) -> LedgerResult<(Amount, bool)> {
        if caller != Caller::Registry {
            return Err(LedgerError::Unauthorized);
        }
        let (_, finish, _) = self.deal_params(registry, pool_id)?;
        let pool = registry.pool(pool_id)?;
        let owner = pool.owner;
        let vault_id = pool.vault_id;
        let ids = CollateralPoolIds::of(pool_id);

        let is_final = Amount::from(now) >= finish;
        let mut main = base::left_amount(registry, ids.main_coin_collector)?;
        let tokens = base::left_amount(registry, ids.token_collector)?;
        if is_final {
            main += base::left_amount(registry, ids.main_coin_holder)?;
        }

        // Custody before parameter updates; a failed movement leaves the
        // deal untouched.
        vaults.withdraw(vault_id, owner, main)?;
        let collector_left = base::left_amount(registry, ids.main_coin_collector)?;
        base::withdraw_from(registry, ids.main_coin_collector, collector_left)?;
        base::withdraw_from(registry, ids.token_collector, tokens)?;
        if is_final {
            let holder_left = base::left_amount(registry, ids.main_coin_holder)?;
            base::withdraw_from(registry, ids.main_coin_holder, holder_left)?;
        }
        let holder_left = base::left_amount(registry, ids.main_coin_holder)?;
        registry.params_mut(pool_id, ProviderKind::Collateral)?[0] = holder_left;
        info!(
            "collateral: deal {pool_id} withdrew {main} main coin and {tokens} tokens, \
             final={is_final}"
        );
        Ok((main, is_final))
    }

    /// Registry-dispatched split, registering four new pools in creation
    /// order so the new deal keeps the +1/+2/+3 layout. The primary and the
    /// collector take the floor carve; the holder takes the remainder of the
    /// primary carve, so on both sides the primary stays equal to
    /// `collector + holder` even when floors disagree. Returns
    /// `(first new pool id, keep, carve)` for the completion signal.
    pub fn on_split(
        &self,
        registry: &mut PoolRegistry,
        caller: Caller,
        pool_id: PoolId,
        ratio: Amount,
        new_owner: Address,
    ) -> LedgerResult<(PoolId, Amount, Amount)> {
        if caller != Caller::Registry {
            return Err(LedgerError::Unauthorized);
        }
        let (main_left, finish, deal_ratio) = self.deal_params(registry, pool_id)?;
        let pool = registry.pool(pool_id)?;
        let token = pool.token;
        let vault_id = pool.vault_id;
        let ids = CollateralPoolIds::of(pool_id);

        let split = math::split_amount(main_left, ratio);
        let collector_left = base::left_amount(registry, ids.main_coin_collector)?;
        let token_left = base::left_amount(registry, ids.token_collector)?;
        let collector_split = math::split_amount(collector_left, ratio);
        let token_split = math::split_amount(token_left, ratio);
        // floor((C+H)r) - floor(Cr) never exceeds H, so the debit holds.
        let holder_carve = split.carve - collector_split.carve;

        registry.params_mut(pool_id, ProviderKind::Collateral)?[0] = split.keep;
        base::withdraw_from(registry, ids.main_coin_collector, collector_split.carve)?;
        base::withdraw_from(registry, ids.token_collector, token_split.carve)?;
        base::withdraw_from(registry, ids.main_coin_holder, holder_carve)?;

        let mut new_params = Params::new();
        new_params.push(split.carve);
        new_params.push(finish);
        new_params.push(deal_ratio);
        let new_collateral = registry.register_pool(
            ProviderKind::Collateral,
            new_owner,
            token,
            vault_id,
            new_params,
        );
        let self_addr = new_owner_of_delegates();
        base::register_delegate(
            registry,
            self.delegate,
            self_addr,
            token,
            vault_id,
            collector_split.carve,
        )?;
        base::register_delegate(
            registry,
            self.delegate,
            self_addr,
            Address::ZERO,
            0,
            token_split.carve,
        )?;
        base::register_delegate(registry, self.delegate, self_addr, token, vault_id, holder_carve)?;
        info!(
            "collateral: deal {pool_id} split into {new_collateral} ({} / {})",
            split.keep, split.carve
        );
        Ok((new_collateral, split.keep, split.carve))
    }
}

/// Delegate pools always belong to the collateral provider itself.
fn new_owner_of_delegates() -> Address {
    ProviderKind::Collateral.address()
}
