// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Grid: uniform block grids over N-dimensional arrays.
//!
//! This crate partitions the index space of a large array into a uniform grid
//! of axis-aligned blocks so that work (fetching, caching, recomputation) can
//! be tracked per block. It provides:
//!
//! - **Block shape selection** ([`determine_block_shape`]): a near-cubic block
//!   shape whose volume stays within a budget.
//! - **Regions** ([`Region`]): validated half-open boxes `start..stop`.
//! - **Block identities** ([`BlockId`]): `Copy` keys naming a block by its
//!   origin, suitable for hash maps and dirty sets.
//! - **Grids** ([`BlockGrid`]): resolving a region to the blocks it touches
//!   and a block to its (edge-clipped) extent.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera_grid::{BlockGrid, Region};
//!
//! // A 200 x 200 x 50 volume, blocks of at most 100 000 elements.
//! let grid = BlockGrid::new(&[200, 200, 50], 100_000).unwrap();
//! assert!(grid.block_shape().iter().product::<usize>() <= 100_000);
//!
//! // Which blocks does an edit touch?
//! let edit = Region::new(&[10, 10, 0], &[20, 20, 5]).unwrap();
//! for id in grid.intersecting_blocks(&edit).unwrap() {
//!     let bounds = grid.block_bounds(id).unwrap();
//!     assert!(bounds.intersection(&edit).unwrap().volume() > 0);
//! }
//! ```
//!
//! ## Channel Axes
//!
//! Grids only partition the axes they are given. Arrays with a trailing
//! channel axis are partitioned on their spatial axes; the channel range is
//! appended to a block's bounds with [`Region::with_axis`] when fetching.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod block;
mod error;
mod grid;
mod region;
mod shape;

use smallvec::SmallVec;

pub use block::BlockId;
pub use error::GridError;
pub use grid::{BlockGrid, BlockIter};
pub use region::Region;
pub use shape::determine_block_shape;

/// Maximum number of axes a shape, region or block identity may have.
pub const MAX_AXES: usize = 8;

/// Inline coordinate storage used for shapes and region corners.
pub type Coords = SmallVec<[usize; MAX_AXES]>;
