//! DNS message serialization benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn serialization_benchmarks(_c: &mut Criterion) {
    // Placeholder for serialization benchmarks
    // TODO: Add benchmarks for:
    // - Message header serialization
    // - Name serialization (with compression)
    // - Record serialization
    // - Full message serialization
}

criterion_group!(benches, serialization_benchmarks);
criterion_main!(benches);
