//! Core identifiers and numeric conventions shared across the ledger.

use arrayvec::ArrayVec;
use core::fmt;

/// Pool identifier. Allocated sequentially by the registry, never reused.
pub type PoolId = u64;

/// Custody vault identifier. Zero means "no custody attached".
pub type VaultId = u64;

/// Amounts, ratios and stored parameters all use this width.
pub type Amount = u128;

/// Unix timestamp in seconds. Widened to [`Amount`] once stored in params.
pub type Timestamp = u64;

/// Maximum parameters a provider may store per pool (timed uses all four).
pub const MAX_PARAMS: usize = 4;

/// Ordered strategy-specific parameter sequence of a pool.
pub type Params = ArrayVec<Amount, MAX_PARAMS>;

/// Fixed denominator for all ratio arithmetic. Halving uses `MAX_RATIO / 2`.
pub const MAX_RATIO: Amount = 1_000_000_000;

/// Opaque 32-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address. Never a valid owner or asset.
    pub const ZERO: Address = Address([0; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Address({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Identity presented to a provider entry point.
///
/// Withdraw/split callbacks are only honored for [`Caller::Registry`]; every
/// other caller is rejected with `Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// The pool registry dispatching an ownership-transfer event.
    Registry,
    /// Anything else.
    External(Address),
}

/// Closed set of provider strategies.
///
/// The registry stores only this tag per pool; all dispatch happens over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ProviderKind {
    /// Immediate unlock, params `[left]`.
    Deal,
    /// Cliff unlock, params `[left, start]`.
    Lock,
    /// Linear unlock, params `[left, start, finish, start_amount]`.
    Timed,
    /// Dual-asset collateral arrangement (four linked pools).
    Collateral,
    /// Tier-routing delay vault.
    DelayVault,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Deal => "DealProvider",
            ProviderKind::Lock => "LockProvider",
            ProviderKind::Timed => "TimedProvider",
            ProviderKind::Collateral => "CollateralProvider",
            ProviderKind::DelayVault => "DelayVaultProvider",
        }
    }

    /// Base strategies store and interpret their own schedule parameters;
    /// composite strategies orchestrate pools of a base delegate.
    pub fn is_base(self) -> bool {
        matches!(
            self,
            ProviderKind::Deal | ProviderKind::Lock | ProviderKind::Timed
        )
    }

    /// Ledger identity of the provider itself. Composite providers own their
    /// delegate pools under this address.
    pub fn address(self) -> Address {
        let mut bytes = [0u8; 32];
        bytes[0] = b'p';
        bytes[1] = b'r';
        bytes[2] = b'v';
        bytes[31] = self as u8 + 1;
        Address(bytes)
    }
}

/// Read snapshot of one pool as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolData {
    pub provider: ProviderKind,
    pub name: &'static str,
    pub pool_id: PoolId,
    pub vault_id: VaultId,
    pub owner: Address,
    pub token: Address,
    pub params: Params,
}
