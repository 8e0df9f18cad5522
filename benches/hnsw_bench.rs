use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prism::hnsw::{HnswIndex, HnswParams};

const DIM: usize = 384;

/// Deterministic pseudo-random unit-ish vector, seeded from the index so
/// benches are reproducible without pulling in a `rand` dependency.
fn fake_vector(seed: usize) -> Vec<f32> {
    (0..DIM)
        .map(|i| {
            let x = (seed * 2654435761 + i * 40503) as u32;
            ((x % 1000) as f32 / 1000.0) - 0.5
        })
        .collect()
}

fn build_index(n: usize) -> HnswIndex {
    let index = HnswIndex::new(HnswParams {
        dimension: DIM,
        ..Default::default()
    });
    for i in 0..n {
        index
            .add(&format!("chunk-{i}"), &fake_vector(i))
            .expect("insert should succeed");
    }
    index
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_add");
    for &n in &[100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let index = HnswIndex::new(HnswParams {
                    dimension: DIM,
                    ..Default::default()
                });
                for i in 0..n {
                    index.add(&format!("chunk-{i}"), black_box(&fake_vector(i))).unwrap();
                }
            })
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_search");
    for &n in &[1_000usize, 10_000] {
        let index = build_index(n);
        let query = fake_vector(n / 2);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| index.search(black_box(&query), 10, None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add, bench_search);
criterion_main!(benches);
