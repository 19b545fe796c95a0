// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recompute engine: builds one block's label/feature matrix.
//!
//! The functions here are lock-free and side-effect free. Locking, dirty-set
//! bookkeeping and installation are handled by the cache that calls them.

use ndarray::{Array2, Dimension};
use smallvec::SmallVec;
use tessera_grid::{BlockGrid, Coords, MAX_AXES, Region};

use crate::error::CacheError;
use crate::source::{ArraySource, FetchError};

/// Result of recomputing one block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Recompute {
    /// A fresh matrix was installed and the block is clean.
    Installed {
        /// Number of labeled points (matrix rows) found in the block.
        rows: usize,
    },
    /// The block was already clean, or the grid changed underneath the
    /// recompute; nothing was installed.
    Skipped,
}

/// Shapes of the two sources and the block grid over their spatial axes.
#[derive(Clone, Debug)]
pub(crate) struct Layout {
    pub(crate) grid: BlockGrid,
    pub(crate) label_shape: Coords,
    pub(crate) feature_shape: Coords,
}

impl Layout {
    /// Validates a pair of source shapes and lays a block grid over them.
    pub(crate) fn resolve(
        label_shape: &[usize],
        feature_shape: &[usize],
        block_volume: usize,
    ) -> Result<Self, CacheError> {
        for shape in [label_shape, feature_shape] {
            if shape.len() < 2 {
                return Err(CacheError::NoSpatialAxes {
                    shape: shape.to_vec(),
                });
            }
            // Fetch regions carry the channel axis, so it counts too.
            if shape.len() > MAX_AXES {
                return Err(CacheError::TooManyAxes {
                    shape: shape.to_vec(),
                    max: MAX_AXES,
                });
            }
        }
        let (label_spatial, label_channels) = split_channels(label_shape);
        let (feature_spatial, feature_channels) = split_channels(feature_shape);
        if label_spatial != feature_spatial {
            return Err(CacheError::ShapeMismatch {
                labels: label_shape.to_vec(),
                features: feature_shape.to_vec(),
            });
        }
        if label_channels != 1 {
            return Err(CacheError::LabelChannels {
                channels: label_channels,
            });
        }
        if feature_channels == 0 {
            return Err(CacheError::NoFeatureChannels);
        }
        Ok(Self {
            grid: BlockGrid::new(label_spatial, block_volume)?,
            label_shape: SmallVec::from_slice(label_shape),
            feature_shape: SmallVec::from_slice(feature_shape),
        })
    }

    /// Returns `true` if these are still the shapes the sources report.
    pub(crate) fn matches(&self, label_shape: &[usize], feature_shape: &[usize]) -> bool {
        self.label_shape.as_slice() == label_shape && self.feature_shape.as_slice() == feature_shape
    }

    pub(crate) fn feature_channels(&self) -> usize {
        split_channels(&self.feature_shape).1
    }

    /// Width of every block matrix: the label column plus one per feature.
    pub(crate) fn columns(&self) -> usize {
        1 + self.feature_channels()
    }

    /// Maps an invalidated region to the spatial index space.
    ///
    /// Regions with the full rank have their channel axis dropped.
    pub(crate) fn spatial_region(&self, region: &Region) -> Result<Region, CacheError> {
        let spatial = self.grid.ndim();
        if region.ndim() == spatial + 1 {
            Ok(region.without_last_axis()?)
        } else if region.ndim() == spatial {
            Ok(region.clone())
        } else {
            Err(CacheError::RegionRank {
                region: region.clone(),
                spatial,
            })
        }
    }
}

fn split_channels(shape: &[usize]) -> (&[usize], usize) {
    match shape.split_last() {
        Some((&channels, spatial)) => (spatial, channels),
        None => (shape, 0),
    }
}

/// Builds the matrix of the block spanning `bounds`.
///
/// Every point with a nonzero label becomes one row: the label in column 0,
/// then the point's feature vector, both widened losslessly to `f64`.
/// Features are fetched only for the bounding box of the labeled points. A
/// block without labels yields a zero-row matrix.
pub(crate) fn extract_block_matrix<L, F>(
    labels: &L,
    features: &F,
    layout: &Layout,
    bounds: &Region,
) -> Result<Array2<f64>, FetchError>
where
    L: ArraySource<u32> + ?Sized,
    F: ArraySource<f32> + ?Sized,
{
    let spatial = bounds.ndim();
    let channels = layout.feature_channels();

    let label_region = bounds.with_axis(0, 1)?;
    let label_block = labels.fetch(&label_region)?;
    check_shape("label block", &label_region, label_block.shape())?;

    let points: Vec<(Coords, u32)> = label_block
        .indexed_iter()
        .filter(|&(_, &label)| label != 0)
        .map(|(index, &label)| (SmallVec::from_slice(&index.slice()[..spatial]), label))
        .collect();
    if points.is_empty() {
        return Ok(Array2::zeros((0, 1 + channels)));
    }

    // Bounding box of the labeled points, relative to the block.
    let mut lo: Coords = points[0].0.clone();
    let mut hi: Coords = points[0].0.clone();
    for (point, _) in &points[1..] {
        for axis in 0..spatial {
            lo[axis] = lo[axis].min(point[axis]);
            hi[axis] = hi[axis].max(point[axis]);
        }
    }
    let box_start: Coords = bounds.start().iter().zip(&lo).map(|(s, l)| s + l).collect();
    let box_stop: Coords = bounds.start().iter().zip(&hi).map(|(s, h)| s + h + 1).collect();
    let feature_region = Region::new(&box_start, &box_stop)?.with_axis(0, channels)?;
    let feature_box = features.fetch(&feature_region)?;
    check_shape("feature box", &feature_region, feature_box.shape())?;

    let mut matrix = Array2::zeros((points.len(), 1 + channels));
    let mut index: Coords = SmallVec::from_elem(0, spatial + 1);
    for (mut row, (point, label)) in matrix.outer_iter_mut().zip(&points) {
        row[0] = f64::from(*label);
        for axis in 0..spatial {
            index[axis] = point[axis] - lo[axis];
        }
        for channel in 0..channels {
            index[spatial] = channel;
            row[1 + channel] = f64::from(feature_box[index.as_slice()]);
        }
    }
    Ok(matrix)
}

fn check_shape(what: &'static str, region: &Region, found: &[usize]) -> Result<(), FetchError> {
    let expected = region.extent();
    if expected.as_slice() == found {
        Ok(())
    } else {
        Err(FetchError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}
