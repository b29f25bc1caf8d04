use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kbindex::vector::{FlatIndex, VectorDimension, VectorIndex, normalize};

/// Deterministic pseudo-random unit vectors.
fn vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            let mut v: Vec<f32> = (0..dim)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    ((state >> 33) as f32 / u32::MAX as f32) - 0.25
                })
                .collect();
            normalize(&mut v).unwrap();
            v
        })
        .collect()
}

fn bench_flat_search(c: &mut Criterion) {
    let dim = 384;
    let query = vectors(1, dim, 7).remove(0);
    let mut group = c.benchmark_group("flat_search");

    for rows in [1_000usize, 10_000] {
        let mut index = FlatIndex::new(VectorDimension::new(dim).unwrap());
        index.add_batch(&vectors(rows, dim, 42)).unwrap();

        // k = 3 with the default over-fetch of 5
        group.bench_with_input(BenchmarkId::from_parameter(rows), &index, |b, index| {
            b.iter(|| index.search(black_box(&query), 15).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flat_search);
criterion_main!(benches);
