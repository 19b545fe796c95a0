// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised for malformed shapes, regions and block identities.

use core::fmt;

use crate::block::BlockId;
use crate::MAX_AXES;

/// Error returned when a shape, region or block identity is malformed.
///
/// Every grid operation validates its input up front, so these errors are
/// raised before any block is resolved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GridError {
    /// The block-volume budget was zero.
    ZeroBudget,
    /// A shape or region had no axes at all.
    NoAxes,
    /// A shape or region had more than [`MAX_AXES`] axes.
    TooManyAxes {
        /// Number of axes that was supplied.
        ndim: usize,
    },
    /// An axis of an array or block shape had zero length.
    ZeroExtent {
        /// Index of the offending axis.
        axis: usize,
    },
    /// Two shapes or a shape and a region disagree on the number of axes.
    RankMismatch {
        /// Number of axes that was expected.
        expected: usize,
        /// Number of axes that was supplied.
        found: usize,
    },
    /// A region had `start > stop` on some axis.
    InvertedBounds {
        /// Index of the offending axis.
        axis: usize,
        /// Start coordinate on that axis.
        start: usize,
        /// Stop coordinate on that axis.
        stop: usize,
    },
    /// A point lies outside the array on some axis.
    OutOfBounds {
        /// Index of the offending axis.
        axis: usize,
        /// Coordinate on that axis.
        index: usize,
        /// Length of the array on that axis.
        len: usize,
    },
    /// The identity is not the origin of a cell in this grid.
    NotABlock {
        /// The rejected identity.
        block: BlockId,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ZeroBudget => f.write_str("block-volume budget must be positive"),
            Self::NoAxes => f.write_str("shape has no axes"),
            Self::TooManyAxes { ndim } => {
                write!(f, "shape has {ndim} axes, at most {MAX_AXES} are supported")
            }
            Self::ZeroExtent { axis } => write!(f, "axis {axis} has zero length"),
            Self::RankMismatch { expected, found } => {
                write!(f, "expected {expected} axes, found {found}")
            }
            Self::InvertedBounds { axis, start, stop } => {
                write!(f, "axis {axis} has start {start} past stop {stop}")
            }
            Self::OutOfBounds { axis, index, len } => {
                write!(f, "index {index} is out of bounds for axis {axis} of length {len}")
            }
            Self::NotABlock { block } => {
                write!(f, "{block} is not the origin of a block in this grid")
            }
        }
    }
}

impl core::error::Error for GridError {}

/// Checks that `ndim` is a supported number of axes.
pub(crate) fn check_rank(ndim: usize) -> Result<(), GridError> {
    match ndim {
        0 => Err(GridError::NoAxes),
        n if n > MAX_AXES => Err(GridError::TooManyAxes { ndim: n }),
        _ => Ok(()),
    }
}

/// Checks that `found` matches the expected rank.
pub(crate) fn check_same_rank(expected: usize, found: usize) -> Result<(), GridError> {
    if expected == found {
        Ok(())
    } else {
        Err(GridError::RankMismatch { expected, found })
    }
}
