// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform block grid over an N-dimensional array.

use smallvec::SmallVec;

use crate::Coords;
use crate::block::BlockId;
use crate::error::{GridError, check_rank, check_same_rank};
use crate::region::Region;
use crate::shape::determine_block_shape;

/// A uniform grid of axis-aligned blocks partitioning an array's index space.
///
/// Cells are identified by their origin ([`BlockId`]). Interior cells have
/// exactly [`block_shape`](Self::block_shape); cells on the far edge of an
/// axis are truncated to the array's extent.
///
/// # Example
///
/// ```
/// use tessera_grid::{BlockGrid, BlockId, Region};
///
/// let grid = BlockGrid::with_block_shape(&[10, 10], &[4, 4]).unwrap();
/// assert_eq!(grid.num_blocks(), 9);
///
/// // An edge block is clipped to the array.
/// let edge = BlockId::new(&[8, 0]).unwrap();
/// let bounds = grid.block_bounds(edge).unwrap();
/// assert_eq!(bounds.start(), &[8, 0]);
/// assert_eq!(bounds.stop(), &[10, 4]);
///
/// // A region straddling a block corner touches four blocks.
/// let touched: Vec<_> = grid
///     .intersecting_blocks(&Region::new(&[3, 3], &[5, 5]).unwrap())
///     .unwrap()
///     .collect();
/// assert_eq!(touched.len(), 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockGrid {
    array_shape: Coords,
    block_shape: Coords,
}

impl BlockGrid {
    /// Creates a grid whose block shape is chosen by [`determine_block_shape`].
    pub fn new(array_shape: &[usize], budget: usize) -> Result<Self, GridError> {
        let block_shape = determine_block_shape(array_shape, budget)?;
        Ok(Self {
            array_shape: SmallVec::from_slice(array_shape),
            block_shape,
        })
    }

    /// Creates a grid with an explicit block shape.
    ///
    /// Block lengths larger than the array are clipped to the array.
    pub fn with_block_shape(array_shape: &[usize], block_shape: &[usize]) -> Result<Self, GridError> {
        check_rank(array_shape.len())?;
        check_same_rank(array_shape.len(), block_shape.len())?;
        for (axis, (&a, &b)) in array_shape.iter().zip(block_shape).enumerate() {
            if a == 0 || b == 0 {
                return Err(GridError::ZeroExtent { axis });
            }
        }
        Ok(Self {
            array_shape: SmallVec::from_slice(array_shape),
            block_shape: array_shape
                .iter()
                .zip(block_shape)
                .map(|(&a, &b)| a.min(b))
                .collect(),
        })
    }

    /// Returns the shape of the partitioned array.
    #[must_use]
    pub fn array_shape(&self) -> &[usize] {
        &self.array_shape
    }

    /// Returns the shape of an interior block.
    #[must_use]
    pub fn block_shape(&self) -> &[usize] {
        &self.block_shape
    }

    /// Returns the number of axes.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.array_shape.len()
    }

    /// Returns the number of blocks along every axis.
    #[must_use]
    pub fn grid_shape(&self) -> Coords {
        self.array_shape
            .iter()
            .zip(&self.block_shape)
            .map(|(&a, &b)| a.div_ceil(b))
            .collect()
    }

    /// Returns the total number of blocks in the grid.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.grid_shape().iter().product()
    }

    /// Returns `true` if `id` is the origin of a block of this grid.
    #[must_use]
    pub fn contains_block(&self, id: BlockId) -> bool {
        id.ndim() == self.ndim()
            && id
                .origin()
                .iter()
                .zip(self.array_shape.iter().zip(&self.block_shape))
                .all(|(&o, (&a, &b))| o < a && o % b == 0)
    }

    /// Returns the block containing `point`.
    pub fn block_of(&self, point: &[usize]) -> Result<BlockId, GridError> {
        check_same_rank(self.ndim(), point.len())?;
        for (axis, (&index, &len)) in point.iter().zip(&self.array_shape).enumerate() {
            if index >= len {
                return Err(GridError::OutOfBounds { axis, index, len });
            }
        }
        let origin: Coords = point
            .iter()
            .zip(&self.block_shape)
            .map(|(&p, &b)| p - p % b)
            .collect();
        Ok(BlockId::from_slice_unchecked(&origin))
    }

    /// Returns the extent of a block, clipped to the array bounds.
    pub fn block_bounds(&self, id: BlockId) -> Result<Region, GridError> {
        if !self.contains_block(id) {
            return Err(GridError::NotABlock { block: id });
        }
        let stop: Coords = id
            .origin()
            .iter()
            .zip(self.array_shape.iter().zip(&self.block_shape))
            .map(|(&o, (&a, &b))| (o + b).min(a))
            .collect();
        Region::new(id.origin(), &stop)
    }

    /// Returns every block whose extent overlaps `region`.
    ///
    /// The region is clipped to the array first; a region that ends up empty
    /// touches no blocks. Blocks are yielded in row-major order of their
    /// origins.
    pub fn intersecting_blocks(&self, region: &Region) -> Result<BlockIter, GridError> {
        check_same_rank(self.ndim(), region.ndim())?;
        let clipped = region.intersection(&Region::from_shape(&self.array_shape)?)?;
        if clipped.is_empty() {
            return Ok(BlockIter::empty());
        }
        // First origin: floor(start / b) * b. Last cell: ceil(stop / b).
        let first = clipped
            .start()
            .iter()
            .zip(&self.block_shape)
            .map(|(&s, &b)| s / b * b)
            .collect();
        Ok(BlockIter {
            step: self.block_shape.clone(),
            first,
            stop: SmallVec::from_slice(clipped.stop()),
            next: None,
            done: false,
        })
    }

    /// Returns every block of the grid in row-major order.
    #[must_use]
    pub fn blocks(&self) -> BlockIter {
        BlockIter {
            step: self.block_shape.clone(),
            first: SmallVec::from_elem(0, self.ndim()),
            stop: self.array_shape.clone(),
            next: None,
            done: false,
        }
    }
}

/// Iterator over block identities produced by [`BlockGrid`].
///
/// Walks block origins `first..stop` with stride `step` on every axis, last
/// axis fastest.
#[derive(Clone, Debug)]
pub struct BlockIter {
    step: Coords,
    first: Coords,
    stop: Coords,
    next: Option<Coords>,
    done: bool,
}

impl BlockIter {
    fn empty() -> Self {
        Self {
            step: SmallVec::new(),
            first: SmallVec::new(),
            stop: SmallVec::new(),
            next: None,
            done: true,
        }
    }
}

impl Iterator for BlockIter {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = match self.next.take() {
            Some(c) => c,
            None => self.first.clone(),
        };
        let id = BlockId::from_slice_unchecked(&current);

        // Advance the odometer.
        let mut following = current;
        let mut axis = following.len();
        loop {
            if axis == 0 {
                self.done = true;
                break;
            }
            axis -= 1;
            following[axis] += self.step[axis];
            if following[axis] < self.stop[axis] {
                self.next = Some(following);
                break;
            }
            following[axis] = self.first[axis];
        }
        Some(id)
    }
}

impl core::iter::FusedIterator for BlockIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn origins(iter: BlockIter) -> Vec<Vec<usize>> {
        iter.map(|id| id.origin().to_vec()).collect()
    }

    #[test]
    fn enumerates_all_blocks_row_major() {
        let grid = BlockGrid::with_block_shape(&[5, 4], &[2, 4]).unwrap();
        assert_eq!(grid.grid_shape().as_slice(), &[3, 1]);
        assert_eq!(
            origins(grid.blocks()),
            [[0, 0], [2, 0], [4, 0]].map(|o| o.to_vec()).to_vec()
        );
    }

    #[test]
    fn intersecting_blocks_use_floor_and_ceil() {
        let grid = BlockGrid::with_block_shape(&[10, 10], &[4, 4]).unwrap();
        let r = Region::new(&[3, 4], &[5, 8]).unwrap();
        assert_eq!(
            origins(grid.intersecting_blocks(&r).unwrap()),
            [[0, 4], [4, 4]].map(|o| o.to_vec()).to_vec()
        );
    }

    #[test]
    fn regions_are_clipped_to_the_array() {
        let grid = BlockGrid::with_block_shape(&[10, 10], &[4, 4]).unwrap();
        let outside = Region::new(&[12, 0], &[20, 10]).unwrap();
        assert_eq!(grid.intersecting_blocks(&outside).unwrap().count(), 0);

        let overhanging = Region::new(&[9, 9], &[100, 100]).unwrap();
        assert_eq!(
            origins(grid.intersecting_blocks(&overhanging).unwrap()),
            [[8, 8]].map(|o| o.to_vec()).to_vec()
        );
    }

    #[test]
    fn empty_region_touches_nothing() {
        let grid = BlockGrid::with_block_shape(&[10, 10], &[4, 4]).unwrap();
        let r = Region::new(&[3, 3], &[3, 9]).unwrap();
        assert_eq!(grid.intersecting_blocks(&r).unwrap().count(), 0);
    }

    #[test]
    fn block_bounds_reject_foreign_identities() {
        let grid = BlockGrid::with_block_shape(&[10, 10], &[4, 4]).unwrap();
        let misaligned = BlockId::new(&[1, 0]).unwrap();
        assert_eq!(
            grid.block_bounds(misaligned),
            Err(GridError::NotABlock { block: misaligned })
        );
        let past_end = BlockId::new(&[12, 0]).unwrap();
        assert!(grid.block_bounds(past_end).is_err());
        let wrong_rank = BlockId::new(&[0]).unwrap();
        assert!(!grid.contains_block(wrong_rank));
    }

    #[test]
    fn block_of_point() {
        let grid = BlockGrid::with_block_shape(&[10, 10], &[4, 4]).unwrap();
        let id = grid.block_of(&[9, 5]).unwrap();
        assert_eq!(id.origin(), &[8, 4]);
        assert_eq!(
            grid.block_of(&[10, 0]),
            Err(GridError::OutOfBounds {
                axis: 0,
                index: 10,
                len: 10
            })
        );
    }

    #[test]
    fn oversized_block_shape_is_clipped() {
        let grid = BlockGrid::with_block_shape(&[3, 7], &[10, 10]).unwrap();
        assert_eq!(grid.block_shape(), &[3, 7]);
        assert_eq!(grid.num_blocks(), 1);
    }

    #[test]
    fn budgeted_grid_respects_budget() {
        let grid = BlockGrid::new(&[512, 512, 64], 100_000).unwrap();
        assert!(grid.block_shape().iter().product::<usize>() <= 100_000);
        assert!(grid.block_shape().iter().zip(grid.array_shape()).all(|(b, a)| b <= a));
    }
}
