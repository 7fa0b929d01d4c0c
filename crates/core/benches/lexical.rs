//! Benchmark the lexical metrics.
//!
//! Run with:
//!   cargo bench -p deepscore-core --bench lexical

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use deepscore_core::{bleu, quasi_exact_match, rouge};

const REFERENCE: &str = "The quarterly earnings report shows revenue increased by 12% \
    year-over-year, driven primarily by strong performance in the cloud services division. \
    Operating margins improved to 28.5%, up from 25.1% in the prior year period.";

const PREDICTION: &str = "Revenue increased 12% year-over-year thanks to the cloud services \
    division, and operating margins improved to 28.5% from 25.1% a year earlier.";

fn bench_rouge(c: &mut Criterion) {
    let mut group = c.benchmark_group("rouge");
    for variant in ["rouge1", "rouge2", "rougeL"] {
        group.bench_with_input(BenchmarkId::from_parameter(variant), &variant, |b, v| {
            b.iter(|| rouge(REFERENCE, PREDICTION, v));
        });
    }
    group.finish();
}

fn bench_bleu(c: &mut Criterion) {
    let mut group = c.benchmark_group("bleu");
    for order in 1..=4 {
        group.bench_with_input(BenchmarkId::from_parameter(order), &order, |b, &n| {
            b.iter(|| bleu(REFERENCE, PREDICTION, n));
        });
    }
    group.finish();
}

fn bench_quasi_exact(c: &mut Criterion) {
    c.bench_function("quasi_exact_match", |b| {
        b.iter(|| quasi_exact_match(REFERENCE, PREDICTION));
    });
}

criterion_group!(benches, bench_rouge, bench_bleu, bench_quasi_exact);
criterion_main!(benches);
