// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tessera_dirty::DirtySet;

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }
}

fn filled(n: u32) -> DirtySet<u32> {
    let mut dirty = DirtySet::new();
    dirty.mark_all(0..n);
    dirty
}

fn bench_dirty_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("tessera_dirty");
    group.sample_size(50);

    for &n in &[256_u32, 4_096, 65_536] {
        group.bench_function(format!("mark_all(n={n})"), |b| {
            b.iter_batched(
                DirtySet::<u32>::new,
                |mut dirty| {
                    dirty.mark_all(0..n);
                    black_box(dirty);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("random_remarks(n={n})"), |b| {
            b.iter_batched(
                || (filled(n), Lcg::new(0xD1A7_0000_0000_0001)),
                |(mut dirty, mut rng)| {
                    for _ in 0..n {
                        dirty.mark(rng.next_u32() % n);
                    }
                    black_box(dirty);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("snapshot_sorted(n={n})"), |b| {
            let dirty = filled(n);
            b.iter(|| black_box(dirty.snapshot_sorted()));
        });

        // The per-block recompute pattern: observe the stamp, then clear.
        group.bench_function(format!("stamp_then_clear(n={n})"), |b| {
            b.iter_batched(
                || filled(n),
                |mut dirty| {
                    for key in dirty.snapshot() {
                        if let Some(stamp) = dirty.stamp(key) {
                            dirty.clear_if_unchanged(key, stamp);
                        }
                    }
                    black_box(dirty);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dirty_set);
criterion_main!(benches);
