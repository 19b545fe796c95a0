// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Upstream array sources.

use std::sync::Arc;

use ndarray::{ArrayD, Slice};
use parking_lot::RwLock;
use tessera_grid::{Coords, GridError, Region};
use thiserror::Error;

/// A read-only, region-addressable N-dimensional array.
///
/// Sources are the cache's only view of the upstream data. The trailing axis
/// of [`shape`](Self::shape) is the channel axis; every other axis is spatial.
///
/// Implementations are expected to be internally synchronized: the cache
/// calls [`fetch`](Self::fetch) concurrently from several worker threads.
pub trait ArraySource<T>: Send + Sync {
    /// Returns the full shape of the array, channel axis last.
    fn shape(&self) -> Coords;

    /// Returns a copy of the elements inside `region`.
    ///
    /// `region` has the same rank as [`shape`](Self::shape). The returned
    /// array must have exactly the region's extent.
    fn fetch(&self, region: &Region) -> Result<ArrayD<T>, FetchError>;
}

impl<T, S> ArraySource<T> for Arc<S>
where
    S: ArraySource<T> + ?Sized,
{
    fn shape(&self) -> Coords {
        (**self).shape()
    }

    fn fetch(&self, region: &Region) -> Result<ArrayD<T>, FetchError> {
        (**self).fetch(region)
    }
}

/// Error returned by an [`ArraySource`] or raised while validating its output.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source could not serve the request.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The requested region does not fit inside the source.
    #[error("region {region} is out of bounds for shape {shape:?}")]
    OutOfBounds {
        /// The rejected region.
        region: Region,
        /// Shape of the source.
        shape: Vec<usize>,
    },
    /// A fetch returned an array whose shape differs from the requested extent.
    #[error("fetched {what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Which fetch produced the array.
        what: &'static str,
        /// Extent of the requested region.
        expected: Vec<usize>,
        /// Shape of the returned array.
        found: Vec<usize>,
    },
    /// A fetch region could not be formed.
    #[error("invalid fetch region: {0}")]
    Region(#[from] GridError),
    /// Any other source-specific failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// An in-memory [`ArraySource`] backed by an [`ArrayD`].
///
/// The array can be mutated through [`write_region`](Self::write_region),
/// [`update`](Self::update) and [`replace`](Self::replace) while the cache
/// reads from it. Mutations do not notify anyone; the embedder reports the
/// changed region to the cache itself.
///
/// # Example
///
/// ```
/// use ndarray::{ArrayD, IxDyn};
/// use tessera_cache::{ArraySource, MemorySource};
/// use tessera_grid::Region;
///
/// let source = MemorySource::new(ArrayD::<u32>::zeros(IxDyn(&[4, 4, 1])));
/// let patch = ArrayD::from_elem(IxDyn(&[2, 2, 1]), 7);
/// let region = Region::new(&[1, 1, 0], &[3, 3, 1]).unwrap();
/// source.write_region(&region, &patch).unwrap();
///
/// let fetched = source.fetch(&region).unwrap();
/// assert!(fetched.iter().all(|&v| v == 7));
/// ```
#[derive(Debug)]
pub struct MemorySource<T> {
    data: RwLock<ArrayD<T>>,
}

impl<T> MemorySource<T>
where
    T: Clone + Send + Sync,
{
    /// Wraps an array.
    #[must_use]
    pub fn new(data: ArrayD<T>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Replaces the whole array. The shape may change.
    pub fn replace(&self, data: ArrayD<T>) {
        *self.data.write() = data;
    }

    /// Overwrites the elements inside `region` with `values`.
    pub fn write_region(&self, region: &Region, values: &ArrayD<T>) -> Result<(), FetchError> {
        let mut data = self.data.write();
        check_bounds(region, data.shape())?;
        let mut view = data.slice_each_axis_mut(|ax| axis_slice(region, ax.axis.index()));
        if view.shape() != values.shape() {
            return Err(FetchError::ShapeMismatch {
                what: "write",
                expected: view.shape().to_vec(),
                found: values.shape().to_vec(),
            });
        }
        view.assign(values);
        Ok(())
    }

    /// Runs `f` with mutable access to the array.
    pub fn update<R>(&self, f: impl FnOnce(&mut ArrayD<T>) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Returns a copy of the whole array.
    #[must_use]
    pub fn snapshot(&self) -> ArrayD<T> {
        self.data.read().clone()
    }
}

impl<T> ArraySource<T> for MemorySource<T>
where
    T: Clone + Send + Sync,
{
    fn shape(&self) -> Coords {
        self.data.read().shape().iter().copied().collect()
    }

    fn fetch(&self, region: &Region) -> Result<ArrayD<T>, FetchError> {
        let data = self.data.read();
        check_bounds(region, data.shape())?;
        Ok(data
            .slice_each_axis(|ax| axis_slice(region, ax.axis.index()))
            .to_owned())
    }
}

fn check_bounds(region: &Region, shape: &[usize]) -> Result<(), FetchError> {
    let fits = region.ndim() == shape.len() && region.stop().iter().zip(shape).all(|(s, n)| s <= n);
    if fits {
        Ok(())
    } else {
        Err(FetchError::OutOfBounds {
            region: region.clone(),
            shape: shape.to_vec(),
        })
    }
}

fn axis_slice(region: &Region, axis: usize) -> Slice {
    Slice::from(region.start()[axis]..region.stop()[axis])
}
