//! Ratio and schedule arithmetic. No panics, no truncating casts.
//!
//! All ratios are integer numerators over the fixed [`MAX_RATIO`]
//! denominator; every division floors. Products that would overflow `u128`
//! fall back to divide-first with bounded precision loss, which only matters
//! for amounts above 2^98.

use crate::types::{Amount, MAX_RATIO};

/// `floor(amount * num / den)`, overflow-tolerant. Returns 0 when `den == 0`.
pub fn mul_div(amount: Amount, num: Amount, den: Amount) -> Amount {
    if den == 0 {
        return 0;
    }
    match amount.checked_mul(num) {
        Some(v) => v / den,
        // Divide first for very large values; precision loss is bounded by
        // `num`, acceptable at these magnitudes.
        None => (amount / den).saturating_mul(num),
    }
}

/// `floor(amount * ratio / MAX_RATIO)`. Ratios above the scale are clamped.
pub fn ratio_mul(amount: Amount, ratio: Amount) -> Amount {
    mul_div(amount, ratio.min(MAX_RATIO), MAX_RATIO)
}

/// Inverse scaling: `floor(amount * MAX_RATIO / ratio)`. Returns 0 when the
/// ratio is 0.
pub fn ratio_div(amount: Amount, ratio: Amount) -> Amount {
    mul_div(amount, MAX_RATIO, ratio)
}

/// Ratio of `part` to `whole` on the `MAX_RATIO` scale.
pub fn ratio_of(part: Amount, whole: Amount) -> Amount {
    mul_div(part, MAX_RATIO, whole)
}

/// Outcome of a floor split. Invariant: `keep + carve` equals the original
/// amount; rounding loss stays in `keep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitAmounts {
    /// What the original pool retains.
    pub keep: Amount,
    /// What the new pool receives: `floor(original * ratio / MAX_RATIO)`.
    pub carve: Amount,
}

/// Split `original` by `ratio / MAX_RATIO` with the floor rule.
pub fn split_amount(original: Amount, ratio: Amount) -> SplitAmounts {
    let carve = ratio_mul(original, ratio);
    SplitAmounts {
        keep: original - carve,
        carve,
    }
}

/// Linear unlock: `floor(total * elapsed / duration)` clamped to `total`.
/// Times are compared in `Amount` space (params store widened timestamps).
pub fn linear_unlock(total: Amount, start: Amount, finish: Amount, now: Amount) -> Amount {
    if now <= start {
        return 0;
    }
    if now >= finish || finish <= start {
        return total;
    }
    mul_div(total, now - start, finish - start).min(total)
}
