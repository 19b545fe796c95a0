// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for cache setup, invalidation and reads.

use std::fmt;

use tessera_grid::{BlockId, GridError, Region};
use thiserror::Error;

use crate::config::ConfigError;
use crate::source::FetchError;

/// Error returned by [`FeatureMatrixCache`](crate::FeatureMatrixCache) operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The configuration was rejected before any block work began.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The two sources disagree on their spatial axes.
    #[error(
        "label and feature sources differ outside the channel axis: labels {labels:?}, features {features:?}"
    )]
    ShapeMismatch {
        /// Full shape of the label source.
        labels: Vec<usize>,
        /// Full shape of the feature source.
        features: Vec<usize>,
    },
    /// The label source does not have exactly one channel.
    #[error("label source must have exactly one channel, found {channels}")]
    LabelChannels {
        /// Length of the label source's channel axis.
        channels: usize,
    },
    /// The feature source has an empty channel axis.
    #[error("feature source has no channels")]
    NoFeatureChannels,
    /// The sources have no spatial axes to partition.
    #[error("source shape {shape:?} has no spatial axes")]
    NoSpatialAxes {
        /// Full shape of the offending source.
        shape: Vec<usize>,
    },
    /// A source has more axes than a fetch region can carry.
    #[error("source shape {shape:?} has {} axes, at most {max} are supported", .shape.len())]
    TooManyAxes {
        /// Full shape of the offending source.
        shape: Vec<usize>,
        /// Largest supported axis count, channel axis included.
        max: usize,
    },
    /// An invalidated region has neither the spatial nor the full rank.
    #[error("region {region} has {} axes, expected {spatial} or {}", .region.ndim(), .spatial + 1)]
    RegionRank {
        /// The rejected region.
        region: Region,
        /// Number of spatial axes of the tracked arrays.
        spatial: usize,
    },
    /// The block grid could not be formed.
    #[error("invalid block grid: {0}")]
    Grid(#[from] GridError),
    /// The recompute worker pool could not be started.
    #[error("failed to start recompute pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    /// One or more blocks failed to recompute during a read.
    #[error(transparent)]
    Recompute(#[from] RecomputeFailure),
    /// The cached block matrices could not be concatenated.
    #[error("failed to concatenate block matrices: {0}")]
    Aggregate(#[from] ndarray::ShapeError),
}

/// A single block whose recomputation failed.
///
/// The block stays dirty and is retried on the next read.
#[derive(Debug, Error)]
#[error("block {block}: {source}")]
pub struct BlockFailure {
    /// The block that failed.
    pub block: BlockId,
    /// The block's clipped extent, when it could be resolved.
    pub region: Option<Region>,
    /// The underlying cause.
    pub source: FetchError,
}

/// Every block failure of one read, reported together once the batch drained.
#[derive(Debug)]
pub struct RecomputeFailure {
    failures: Vec<BlockFailure>,
    attempted: usize,
}

impl RecomputeFailure {
    pub(crate) fn new(mut failures: Vec<BlockFailure>, attempted: usize) -> Self {
        failures.sort_by_key(|f| f.block);
        Self {
            failures,
            attempted,
        }
    }

    /// Returns the failed blocks, ordered by block identity.
    #[must_use]
    pub fn failures(&self) -> &[BlockFailure] {
        &self.failures
    }

    /// Returns the number of blocks the read tried to recompute.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.attempted
    }
}

impl fmt::Display for RecomputeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} dirty blocks failed to recompute",
            self.failures.len(),
            self.attempted
        )?;
        if let Some(first) = self.failures.first() {
            write!(f, "; first failure: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RecomputeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| f as &(dyn std::error::Error + 'static))
    }
}
