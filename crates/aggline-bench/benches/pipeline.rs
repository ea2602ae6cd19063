//! Order analytics pipeline benchmarks.
//!
//! Measures the full run (lookups, derivation, three facets) and compares
//! pooled facet execution with sequential execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use aggline::{AnalyticsConfig, AnalyticsService, InMemoryProvider};
use aggline_bench::fixtures::{generate_dataset, Scale, SEED};
use aggline_core::EngineConfig;

fn bench_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/analytics");

    for scale in [Scale::Small, Scale::Medium] {
        let dataset = generate_dataset(scale, SEED);
        let service =
            AnalyticsService::new(InMemoryProvider::default(), AnalyticsConfig::default()).unwrap();

        group.throughput(Throughput::Elements(dataset.orders.len() as u64));
        group.bench_with_input(BenchmarkId::new("orders", scale.name()), &dataset, |b, dataset| {
            b.iter(|| black_box(service.analyze(dataset).unwrap()));
        });
    }

    group.finish();
}

fn bench_facet_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/facets");
    let dataset = generate_dataset(Scale::Medium, SEED);

    let modes = [
        ("sequential", EngineConfig::new().sequential_facets()),
        ("pool_2", EngineConfig::new().with_facet_workers(2)),
        ("pool_3", EngineConfig::new().with_facet_workers(3)),
    ];

    for (name, engine) in modes {
        let service = AnalyticsService::new(
            InMemoryProvider::default(),
            AnalyticsConfig::new().with_engine(engine),
        )
        .unwrap();

        group.bench_function(name, |b| {
            b.iter(|| black_box(service.analyze(&dataset).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analytics, bench_facet_modes);
criterion_main!(benches);
