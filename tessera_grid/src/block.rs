// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block identities: the origin coordinate of one grid cell.

use core::fmt;

use crate::MAX_AXES;
use crate::error::{GridError, check_rank};

/// Identifies one cell of a [`BlockGrid`](crate::BlockGrid) by its origin.
///
/// A `BlockId` is a small `Copy` value that can be used directly as a map or
/// set key. It stores the origin of the cell (the coordinate of its first
/// element on every spatial axis), so identities produced by the same grid
/// compare and hash consistently no matter which operation produced them.
///
/// Identities order lexicographically by origin, which is row-major order
/// over the grid.
///
/// # Example
///
/// ```
/// use tessera_grid::BlockId;
///
/// let a = BlockId::new(&[0, 64]).unwrap();
/// let b = BlockId::new(&[64, 0]).unwrap();
///
/// assert!(a < b);
/// assert_eq!(a.origin(), &[0, 64]);
/// assert_eq!(format!("{b}"), "(64, 0)");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    origin: [usize; MAX_AXES],
    ndim: u8,
}

impl BlockId {
    /// Creates an identity from the origin coordinates of a block.
    ///
    /// Fails if `origin` is empty or has more than [`MAX_AXES`] axes.
    pub fn new(origin: &[usize]) -> Result<Self, GridError> {
        check_rank(origin.len())?;
        Ok(Self::from_slice_unchecked(origin))
    }

    /// Builds an identity from a slice whose rank has already been checked.
    pub(crate) fn from_slice_unchecked(origin: &[usize]) -> Self {
        let mut coords = [0; MAX_AXES];
        coords[..origin.len()].copy_from_slice(origin);
        #[expect(clippy::cast_possible_truncation, reason = "rank <= MAX_AXES")]
        let ndim = origin.len() as u8;
        Self {
            origin: coords,
            ndim,
        }
    }

    /// Returns the origin coordinate on every axis.
    #[must_use]
    pub fn origin(&self) -> &[usize] {
        &self.origin[..self.ndim()]
    }

    /// Returns the number of axes.
    #[must_use]
    pub fn ndim(&self) -> usize {
        usize::from(self.ndim)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = f.debug_tuple("BlockId");
        for c in self.origin() {
            t.field(c);
        }
        t.finish()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, c) in self.origin().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn rejects_bad_rank() {
        assert_eq!(BlockId::new(&[]), Err(GridError::NoAxes));
        assert_eq!(
            BlockId::new(&[0; MAX_AXES + 1]),
            Err(GridError::TooManyAxes { ndim: MAX_AXES + 1 })
        );
    }

    #[test]
    fn different_ranks_are_distinct() {
        let short = BlockId::new(&[0, 0]).unwrap();
        let long = BlockId::new(&[0, 0, 0]).unwrap();
        assert_ne!(short, long);
        assert_eq!(short.ndim(), 2);
        assert_eq!(long.ndim(), 3);
    }

    #[test]
    fn formatting() {
        let id = BlockId::new(&[3, 0, 12]).unwrap();
        assert_eq!(format!("{id}"), "(3, 0, 12)");
        assert_eq!(format!("{id:?}"), "BlockId(3, 0, 12)");
    }
}
