// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tessera_grid::{BlockGrid, Region, determine_block_shape};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn below(&mut self, upper: usize) -> usize {
        (self.next_u32() as usize) % upper
    }
}

fn random_regions(shape: &[usize], count: usize, seed: u64) -> Vec<Region> {
    let mut rng = Lcg(seed);
    (0..count)
        .map(|_| {
            let (start, stop): (Vec<usize>, Vec<usize>) = shape
                .iter()
                .map(|&len| {
                    let a = rng.below(len);
                    let b = rng.below(len);
                    (a.min(b), a.max(b) + 1)
                })
                .unzip();
            Region::new(&start, &stop).unwrap()
        })
        .collect()
}

fn bench_block_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("tessera_grid");

    group.bench_function("determine_block_shape(3d)", |b| {
        b.iter(|| determine_block_shape(black_box(&[4_096_usize, 4_096, 512][..]), black_box(1_000_000)));
    });

    group.bench_function("determine_block_shape(5d)", |b| {
        b.iter(|| determine_block_shape(black_box(&[9_usize, 40, 300, 300, 300][..]), black_box(1_000_000)));
    });

    for &(shape, budget) in &[
        (&[512_usize, 512, 512][..], 32_768_usize),
        (&[2_048, 2_048, 64][..], 1_000_000),
    ] {
        let grid = BlockGrid::new(shape, budget).unwrap();
        let regions = random_regions(shape, 256, 0x6B1D_0000_0000_0001);
        group.bench_function(format!("intersecting_blocks({shape:?},{budget})"), |b| {
            b.iter(|| {
                let mut count = 0_usize;
                for region in &regions {
                    count += grid.intersecting_blocks(region).unwrap().count();
                }
                black_box(count)
            });
        });

        group.bench_function(format!("all_bounds({shape:?},{budget})"), |b| {
            b.iter(|| {
                let volume: usize = grid
                    .blocks()
                    .map(|id| grid.block_bounds(id).unwrap().volume())
                    .sum();
                black_box(volume)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_block_grid);
criterion_main!(benches);
