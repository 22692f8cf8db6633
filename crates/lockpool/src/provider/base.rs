//! Base strategies: immediate (deal), cliff (lock) and linear (timed).
//!
//! Parameter layouts, `params[0]` always the remaining "left" amount:
//!
//! - deal:  `[left]`
//! - lock:  `[left, start]`
//! - timed: `[left, start, finish, start_amount]`
//!
//! Creation validates the schedule but never touches custody; funding the
//! vault is the caller's responsibility. Withdraw and split are registry-only
//! callbacks.

use log::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::math::{self, SplitAmounts};
use crate::registry::{Pool, PoolRegistry};
use crate::types::{Address, Amount, Caller, Params, PoolId, ProviderKind, Timestamp, VaultId};
use crate::vault::VaultManager;

fn ensure_registry(caller: Caller) -> LedgerResult<()> {
    match caller {
        Caller::Registry => Ok(()),
        Caller::External(_) => Err(LedgerError::Unauthorized),
    }
}

fn ensure_base(pool: &Pool) -> LedgerResult<()> {
    if pool.provider.is_base() {
        Ok(())
    } else {
        Err(LedgerError::InvalidParams("not a base-strategy pool"))
    }
}

/// Validate `params` against the schema of `kind` and normalize them to
/// storage form (timed pools always store all four values).
pub fn validate_params(
    kind: ProviderKind,
    params: &[Amount],
    now: Timestamp,
) -> LedgerResult<Params> {
    let now = Amount::from(now);
    match kind {
        ProviderKind::Deal => {
            if params.len() != 1 {
                return Err(LedgerError::InvalidParams("deal expects [left]"));
            }
            Ok(params.iter().copied().collect())
        }
        ProviderKind::Lock => {
            if params.len() != 2 {
                return Err(LedgerError::InvalidParams("lock expects [left, start]"));
            }
            if params[1] <= now {
                return Err(LedgerError::InvalidSchedule);
            }
            Ok(params.iter().copied().collect())
        }
        ProviderKind::Timed => {
            if params.len() != 3 && params.len() != 4 {
                return Err(LedgerError::InvalidParams(
                    "timed expects [left, start, finish] or [left, start, finish, start_amount]",
                ));
            }
            let (start, finish) = (params[1], params[2]);
            if start <= now || finish <= start {
                return Err(LedgerError::InvalidSchedule);
            }
            if params.len() == 4 && params[3] != params[0] {
                return Err(LedgerError::InvalidParams(
                    "start_amount must equal left at creation",
                ));
            }
            let mut stored: Params = params.iter().copied().collect();
            if stored.len() == 3 {
                stored.push(params[0]);
            }
            Ok(stored)
        }
        _ => Err(LedgerError::InvalidParams("not a base strategy")),
    }
}

/// Create a pool under a base strategy. No custody side effect.
pub fn create_pool(
    registry: &mut PoolRegistry,
    kind: ProviderKind,
    owner: Address,
    token: Address,
    vault_id: VaultId,
    params: &[Amount],
    now: Timestamp,
) -> LedgerResult<PoolId> {
    if owner.is_zero() {
        return Err(LedgerError::InvalidAddress);
    }
    let stored = validate_params(kind, params, now)?;
    Ok(registry.register_pool(kind, owner, token, vault_id, stored))
}

/// Register a delegate accounting pool for a composite provider. Delegates
/// use the immediate `[amount]` layout; only a deal-schema delegate can hold
/// it.
pub(crate) fn register_delegate(
    registry: &mut PoolRegistry,
    kind: ProviderKind,
    owner: Address,
    token: Address,
    vault_id: VaultId,
    amount: Amount,
) -> LedgerResult<PoolId> {
    if kind != ProviderKind::Deal {
        return Err(LedgerError::InvalidParams(
            "delegate must use the immediate layout",
        ));
    }
    let mut params = Params::new();
    params.push(amount);
    Ok(registry.register_pool(kind, owner, token, vault_id, params))
}

/// Pure unlock computation; never mutates, never cached.
pub fn withdrawable_amount(pool: &Pool, now: Timestamp) -> Amount {
    let now = Amount::from(now);
    let left = pool.params[0];
    match pool.provider {
        ProviderKind::Deal => left,
        ProviderKind::Lock => {
            if now >= pool.params[1] {
                left
            } else {
                0
            }
        }
        ProviderKind::Timed => {
            let (start, finish, start_amount) = (pool.params[1], pool.params[2], pool.params[3]);
            let unlocked = math::linear_unlock(start_amount, start, finish, now);
            // Subtract what was already withdrawn from this schedule.
            unlocked.saturating_sub(start_amount - left).min(left)
        }
        _ => 0,
    }
}

/// Registry-dispatched withdrawal: move the withdrawable amount out of
/// custody to the owner and decrement `left` by exactly that amount.
/// Returns `(withdrawn, is_final)`.
pub fn on_withdraw(
    registry: &mut PoolRegistry,
    vaults: &mut VaultManager,
    caller: Caller,
    pool_id: PoolId,
    now: Timestamp,
) -> LedgerResult<(Amount, bool)> {
    ensure_registry(caller)?;
    let pool = registry.pool(pool_id)?;
    ensure_base(pool)?;
    let kind = pool.provider;
    let owner = pool.owner;
    let vault_id = pool.vault_id;
    let amount = withdrawable_amount(pool, now);

    // Custody movement first: it can fail, parameter updates cannot.
    if vault_id != 0 {
        vaults.withdraw(vault_id, owner, amount)?;
    }
    let params = registry.params_mut(pool_id, kind)?;
    params[0] -= amount;
    let is_final = params[0] == 0;
    debug!("{}: pool {pool_id} withdrew {amount}, final={is_final}", kind.name());
    Ok((amount, is_final))
}

/// Registry-dispatched split with the floor rule: the new pool receives
/// `floor(left * ratio / MAX_RATIO)`, time parameters are copied unchanged
/// and the vault id is shared. Rounding loss stays with the original.
pub fn on_split(
    registry: &mut PoolRegistry,
    caller: Caller,
    pool_id: PoolId,
    ratio: Amount,
    new_owner: Address,
) -> LedgerResult<(PoolId, SplitAmounts)> {
    ensure_registry(caller)?;
    let pool = registry.pool(pool_id)?;
    ensure_base(pool)?;
    let kind = pool.provider;
    let token = pool.token;
    let vault_id = pool.vault_id;
    let mut new_params = pool.params.clone();

    let split = math::split_amount(pool.params[0], ratio);
    new_params[0] = split.carve;
    if kind == ProviderKind::Timed {
        // start_amount splits with the same floor so the schedule stays
        // proportional on both sides.
        let start_split = math::split_amount(pool.params[3], ratio);
        new_params[3] = start_split.carve;
        registry.params_mut(pool_id, kind)?[3] = start_split.keep;
    }
    let params = registry.params_mut(pool_id, kind)?;
    params[0] = split.keep;

    let new_pool_id = registry.register_pool(kind, new_owner, token, vault_id, new_params);
    debug!(
        "{}: pool {pool_id} split into {new_pool_id} ({} / {})",
        kind.name(),
        split.keep,
        split.carve
    );
    Ok((new_pool_id, split))
}

/// Remaining amount of a delegate pool.
pub(crate) fn left_amount(registry: &PoolRegistry, pool_id: PoolId) -> LedgerResult<Amount> {
    let pool = registry.pool(pool_id)?;
    ensure_base(pool)?;
    Ok(pool.params[0])
}

/// Credit a delegate accounting pool.
pub(crate) fn deposit_into(
    registry: &mut PoolRegistry,
    pool_id: PoolId,
    amount: Amount,
) -> LedgerResult<()> {
    let kind = registry.pool(pool_id)?.provider;
    let params = registry.params_mut(pool_id, kind)?;
    params[0] = params[0].saturating_add(amount);
    Ok(())
}

/// Debit a delegate accounting pool. The caller is responsible for clamping;
/// overdrawing the cell is a logic error and is rejected.
pub(crate) fn withdraw_from(
    registry: &mut PoolRegistry,
    pool_id: PoolId,
    amount: Amount,
) -> LedgerResult<()> {
    let kind = registry.pool(pool_id)?.provider;
    let params = registry.params_mut(pool_id, kind)?;
    if params[0] < amount {
        return Err(LedgerError::InvalidParams("delegate pool overdrawn"));
    }
    params[0] -= amount;
    Ok(())
}
