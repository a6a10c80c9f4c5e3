//! Criterion benchmarks for the divide-and-conquer scramble.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use cowarray_bench::{reference_profile, stress_profile};
use cowarray_test_utils::scramble::{scramble, Interference};

/// Benchmark: scramble a uniquely owned 10K array in place.
fn bench_scramble_10k(c: &mut Criterion) {
    let mut array = reference_profile().build(42);
    c.bench_function("scramble_10k", |b| {
        b.iter(|| {
            let reallocations = scramble(&mut array, &mut Interference::off());
            black_box(reallocations);
        });
    });
}

/// Benchmark: scramble a 10K array while interference copies and escapes pieces.
fn bench_scramble_interference_10k(c: &mut Criterion) {
    let mut array = reference_profile().build(42);
    c.bench_function("scramble_interference_10k", |b| {
        b.iter(|| {
            let mut interference = Interference::on();
            let reallocations = scramble(&mut array, &mut interference);
            interference.release();
            black_box(reallocations);
        });
    });
}

/// Benchmark: scramble a uniquely owned 100K array in place.
fn bench_scramble_100k(c: &mut Criterion) {
    let mut array = stress_profile().build(42);
    c.bench_function("scramble_100k", |b| {
        b.iter(|| {
            let reallocations = scramble(&mut array, &mut Interference::off());
            black_box(reallocations);
        });
    });
}

criterion_group!(
    benches,
    bench_scramble_10k,
    bench_scramble_interference_10k,
    bench_scramble_100k
);
criterion_main!(benches);
