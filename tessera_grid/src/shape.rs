// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block shape selection under a volume budget.

use smallvec::SmallVec;

use crate::Coords;
use crate::error::{GridError, check_rank};

/// Chooses a near-cubic block shape for an array whose volume does not
/// exceed `budget` elements.
///
/// Axes are visited from the shortest to the longest. Each axis receives the
/// integer `k`-th root of the budget still available (where `k` is the number
/// of axes not yet visited), clipped to the array's extent on that axis, and
/// the remaining budget is divided by the chosen length. Short axes are
/// therefore taken whole and the budget they leave unused flows to the longer
/// axes, while the longer axes share it evenly.
///
/// The result satisfies two invariants:
///
/// - `block[i] <= shape[i]` for every axis, and
/// - the product of `block` is at most `budget`.
///
/// `shape` describes the axes that are partitioned. Callers that work with a
/// trailing channel axis strip it before calling this function, because blocks
/// always span every channel.
///
/// # Errors
///
/// Fails fast on a zero budget, an empty or over-long shape, and any axis of
/// length zero.
///
/// # Example
///
/// ```
/// use tessera_grid::determine_block_shape;
///
/// let block = determine_block_shape(&[300, 300, 300], 1_000_000).unwrap();
/// assert_eq!(block.as_slice(), &[100, 100, 100]);
///
/// // A thin axis is taken whole; the other two share what remains.
/// let block = determine_block_shape(&[4, 10_000, 10_000], 1_000_000).unwrap();
/// assert_eq!(block.as_slice(), &[4, 500, 500]);
/// ```
pub fn determine_block_shape(shape: &[usize], budget: usize) -> Result<Coords, GridError> {
    check_rank(shape.len())?;
    if budget == 0 {
        return Err(GridError::ZeroBudget);
    }
    if let Some(axis) = shape.iter().position(|&len| len == 0) {
        return Err(GridError::ZeroExtent { axis });
    }

    let mut order: SmallVec<[usize; crate::MAX_AXES]> = (0..shape.len()).collect();
    order.sort_by_key(|&axis| (shape[axis], axis));

    let mut block: Coords = SmallVec::from_elem(1, shape.len());
    let mut remaining = budget;
    for (visited, &axis) in order.iter().enumerate() {
        let axes_left = u32::try_from(shape.len() - visited).unwrap_or(u32::MAX);
        let side = integer_root(remaining, axes_left).clamp(1, shape[axis]);
        block[axis] = side;
        remaining /= side;
    }
    Ok(block)
}

/// Returns the largest `r` with `r^k <= value`, for `value >= 1` and `k >= 1`.
fn integer_root(value: usize, k: u32) -> usize {
    if k <= 1 || value <= 1 {
        return value;
    }
    let fits = |r: usize| r.checked_pow(k).is_some_and(|p| p <= value);
    let (mut lo, mut hi) = (1_usize, value);
    // Invariant: fits(lo) and !fits(hi + 1).
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}
