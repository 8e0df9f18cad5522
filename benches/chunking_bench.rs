use criterion::{black_box, criterion_group, criterion_main, Criterion};
use prism::chunker::SemanticChunker;
use prism::Chunker;
use std::path::Path;

fn sample_rust_source(functions: usize) -> String {
    let mut src = String::new();
    for i in 0..functions {
        src.push_str(&format!(
            "/// Doc comment for function {i}\nfn function_{i}(a: i32, b: i32) -> i32 {{\n    let sum = a + b;\n    sum * {i}\n}}\n\n"
        ));
    }
    src
}

fn bench_semantic_chunking(c: &mut Criterion) {
    let chunker = SemanticChunker::new(5, 200, 3);
    let small = sample_rust_source(20);
    let large = sample_rust_source(500);

    c.bench_function("chunk_file/small_rust_file", |b| {
        b.iter(|| chunker.chunk_file(Path::new("bench.rs"), black_box(&small)).unwrap())
    });

    c.bench_function("chunk_file/large_rust_file", |b| {
        b.iter(|| chunker.chunk_file(Path::new("bench.rs"), black_box(&large)).unwrap())
    });
}

criterion_group!(benches, bench_semantic_chunking);
criterion_main!(benches);
