// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for cache integration tests.

#![allow(
    missing_docs,
    dead_code,
    reason = "Integration-test helper module; not every test file uses every helper."
)]

use std::sync::Arc;

use ndarray::{Array2, ArrayD, Dimension, IxDyn};
use tessera_cache::{CacheConfig, FeatureMatrixCache, MemorySource};

pub(crate) type Labels = Arc<MemorySource<u32>>;
pub(crate) type Features = Arc<MemorySource<f32>>;
pub(crate) type Cache = FeatureMatrixCache<Labels, Features>;

#[derive(Clone)]
pub(crate) struct Lcg(pub(crate) u64);

impl Lcg {
    pub(crate) fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    pub(crate) fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}

fn with_channels(spatial: &[usize], channels: usize) -> IxDyn {
    let mut shape = spatial.to_vec();
    shape.push(channels);
    IxDyn(&shape)
}

/// Features that spell out each point's own coordinates, one channel per axis.
pub(crate) fn coordinate_features(spatial: &[usize]) -> ArrayD<f32> {
    ArrayD::from_shape_fn(with_channels(spatial, spatial.len()), |ix| {
        let channel = ix[ix.ndim() - 1];
        ix[channel] as f32
    })
}

/// Labels in `1..=classes` at roughly `percent` of the points, zero elsewhere.
pub(crate) fn random_labels(spatial: &[usize], percent: u32, classes: u32, rng: &mut Lcg) -> ArrayD<u32> {
    ArrayD::from_shape_fn(with_channels(spatial, 1), |_| {
        if rng.below(100) < percent {
            1 + rng.below(classes)
        } else {
            0
        }
    })
}

pub(crate) fn empty_labels(spatial: &[usize]) -> ArrayD<u32> {
    ArrayD::zeros(with_channels(spatial, 1))
}

/// Builds a cache over in-memory sources and hands back the sources too.
pub(crate) fn build(labels: ArrayD<u32>, features: ArrayD<f32>, block_volume: usize) -> (Labels, Features, Cache) {
    let labels = Arc::new(MemorySource::new(labels));
    let features = Arc::new(MemorySource::new(features));
    let cache = FeatureMatrixCache::new(
        Arc::clone(&labels),
        Arc::clone(&features),
        CacheConfig::default()
            .with_block_volume(block_volume)
            .with_max_workers(4),
    )
    .unwrap();
    (labels, features, cache)
}

/// Rows of `matrix`, sorted so that matrices can be compared as row sets.
pub(crate) fn sorted_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    let mut rows: Vec<Vec<f64>> = matrix.outer_iter().map(|r| r.to_vec()).collect();
    rows.sort_by(|a, b| a.partial_cmp(b).unwrap());
    rows
}

/// Brute-force rows for every labeled point, sorted like [`sorted_rows`].
pub(crate) fn expected_rows(labels: &ArrayD<u32>, features: &ArrayD<f32>) -> Vec<Vec<f64>> {
    let channels = features.shape()[features.ndim() - 1];
    let mut rows = Vec::new();
    for (ix, &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let mut index = ix.slice().to_vec();
        let mut row = vec![f64::from(label)];
        for channel in 0..channels {
            *index.last_mut().unwrap() = channel;
            row.push(f64::from(features[index.as_slice()]));
        }
        rows.push(row);
    }
    rows.sort_by(|a, b| a.partial_cmp(b).unwrap());
    rows
}
