// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned, half-open N-dimensional regions.

use core::fmt;

use smallvec::SmallVec;

use crate::Coords;
use crate::error::{GridError, check_rank, check_same_rank};

/// A half-open axis-aligned box `start..stop` in an N-dimensional index space.
///
/// Regions are validated on construction: both corners have the same number
/// of axes (between 1 and [`MAX_AXES`](crate::MAX_AXES)) and `start <= stop`
/// on every axis. A region with `start == stop` on some axis is empty but
/// well-formed.
///
/// # Example
///
/// ```
/// use tessera_grid::Region;
///
/// let r = Region::new(&[0, 2], &[4, 8]).unwrap();
/// assert_eq!(r.extent().as_slice(), &[4, 6]);
/// assert_eq!(r.volume(), 24);
/// assert!(r.contains(&[3, 2]));
/// assert!(!r.contains(&[4, 2]));
///
/// assert!(Region::new(&[5], &[4]).is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Region {
    start: Coords,
    stop: Coords,
}

impl Region {
    /// Creates a region from its two corners.
    pub fn new(start: &[usize], stop: &[usize]) -> Result<Self, GridError> {
        check_rank(start.len())?;
        check_same_rank(start.len(), stop.len())?;
        for (axis, (&a, &b)) in start.iter().zip(stop).enumerate() {
            if a > b {
                return Err(GridError::InvertedBounds {
                    axis,
                    start: a,
                    stop: b,
                });
            }
        }
        Ok(Self {
            start: SmallVec::from_slice(start),
            stop: SmallVec::from_slice(stop),
        })
    }

    /// Creates the region `0..shape` covering a whole array.
    pub fn from_shape(shape: &[usize]) -> Result<Self, GridError> {
        check_rank(shape.len())?;
        Ok(Self {
            start: SmallVec::from_elem(0, shape.len()),
            stop: SmallVec::from_slice(shape),
        })
    }

    /// Returns the inclusive start corner.
    #[must_use]
    pub fn start(&self) -> &[usize] {
        &self.start
    }

    /// Returns the exclusive stop corner.
    #[must_use]
    pub fn stop(&self) -> &[usize] {
        &self.stop
    }

    /// Returns the number of axes.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.start.len()
    }

    /// Returns the length of the region on every axis.
    #[must_use]
    pub fn extent(&self) -> Coords {
        self.start
            .iter()
            .zip(&self.stop)
            .map(|(&a, &b)| b - a)
            .collect()
    }

    /// Returns the number of index points inside the region.
    #[must_use]
    pub fn volume(&self) -> usize {
        self.extent().iter().product()
    }

    /// Returns `true` if the region contains no index points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.iter().zip(&self.stop).any(|(a, b)| a == b)
    }

    /// Returns `true` if `point` lies inside the region.
    ///
    /// A point with the wrong number of axes is never contained.
    #[must_use]
    pub fn contains(&self, point: &[usize]) -> bool {
        point.len() == self.ndim()
            && point
                .iter()
                .zip(self.start.iter().zip(&self.stop))
                .all(|(p, (a, b))| a <= p && p < b)
    }

    /// Returns the overlap of two regions of the same rank.
    ///
    /// Disjoint regions produce an empty region anchored at the larger start.
    pub fn intersection(&self, other: &Self) -> Result<Self, GridError> {
        check_same_rank(self.ndim(), other.ndim())?;
        let start: Coords = self
            .start
            .iter()
            .zip(&other.start)
            .map(|(&a, &b)| a.max(b))
            .collect();
        let stop = self
            .stop
            .iter()
            .zip(&other.stop)
            .zip(&start)
            .map(|((&a, &b), &s)| a.min(b).max(s))
            .collect();
        Ok(Self { start, stop })
    }

    /// Returns a copy of this region with one more trailing axis `start..stop`.
    ///
    /// This is how a spatial region gains its channel range before a fetch.
    pub fn with_axis(&self, start: usize, stop: usize) -> Result<Self, GridError> {
        let mut lo = self.start.clone();
        let mut hi = self.stop.clone();
        lo.push(start);
        hi.push(stop);
        Self::new(&lo, &hi)
    }

    /// Returns a copy of this region with its trailing axis removed.
    pub fn without_last_axis(&self) -> Result<Self, GridError> {
        let n = self.ndim() - 1;
        check_rank(n)?;
        Ok(Self {
            start: SmallVec::from_slice(&self.start[..n]),
            stop: SmallVec::from_slice(&self.stop[..n]),
        })
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region{self}")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (a, b)) in self.start.iter().zip(&self.stop).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{a}..{b}")?;
        }
        f.write_str("]")
    }
}
