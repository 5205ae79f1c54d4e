//! End-to-end query benchmarks.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn e2e_benchmarks(_c: &mut Criterion) {
    // Placeholder for end-to-end benchmarks
    // TODO: Add benchmarks for:
    // - Full query resolution path
    // - Cache hit scenarios
    // - Cache miss scenarios
    // - Filtered query scenarios
}

criterion_group!(benches, e2e_benchmarks);
criterion_main!(benches);
