// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use ndarray::{ArrayD, IxDyn};
use tessera_cache::{CacheConfig, FeatureMatrixCache, MemorySource};
use tessera_grid::Region;

type Cache = FeatureMatrixCache<Arc<MemorySource<u32>>, Arc<MemorySource<f32>>>;

const SHAPE: [usize; 3] = [64, 128, 128];
const CHANNELS: usize = 8;

/// Sparse brush strokes: a labeled line every 16 rows.
fn labels() -> ArrayD<u32> {
    ArrayD::from_shape_fn(IxDyn(&[SHAPE[0], SHAPE[1], SHAPE[2], 1]), |ix| {
        if ix[1] % 16 == 0 && ix[2] % 3 == 0 {
            1 + (ix[0] % 2) as u32
        } else {
            0
        }
    })
}

fn features() -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(&[SHAPE[0], SHAPE[1], SHAPE[2], CHANNELS]), |ix| {
        (ix[0] + ix[1] + ix[2] + ix[3]) as f32
    })
}

fn cache(block_volume: usize) -> Cache {
    FeatureMatrixCache::new(
        Arc::new(MemorySource::new(labels())),
        Arc::new(MemorySource::new(features())),
        CacheConfig::default().with_block_volume(block_volume),
    )
    .unwrap()
}

fn bench_feature_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("tessera_cache");
    group.sample_size(20);

    for &block_volume in &[16_384_usize, 131_072] {
        let warm = cache(block_volume);
        warm.get_matrix().unwrap();

        group.bench_function(format!("clean_read(block={block_volume})"), |b| {
            b.iter(|| black_box(warm.get_matrix().unwrap()));
        });

        group.bench_function(format!("one_block_dirty(block={block_volume})"), |b| {
            let region = Region::new(&[10, 10, 10], &[11, 11, 11]).unwrap();
            b.iter(|| {
                warm.on_region_invalidated(&region).unwrap();
                black_box(warm.get_matrix().unwrap())
            });
        });

        group.bench_function(format!("fully_dirty_read(block={block_volume})"), |b| {
            b.iter_batched(
                || {
                    warm.invalidate_all();
                },
                |()| black_box(warm.get_matrix().unwrap()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_feature_cache);
criterion_main!(benches);
