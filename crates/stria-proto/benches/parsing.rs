//! DNS message parsing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn parsing_benchmarks(_c: &mut Criterion) {
    // Placeholder for parsing benchmarks
    // TODO: Add benchmarks for:
    // - Message header parsing
    // - Name parsing
    // - Record parsing
    // - Full message parsing
}

criterion_group!(benches, parsing_benchmarks);
criterion_main!(benches);
