//! Criterion benchmarks for source splitting and filtering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hazard_core::types::Location;
use hazard_sources::site::{SiteCollection, SourceFilter};
use hazard_sources::source::{split_all, MagRate, Source, SourceKind};

fn make_sources(n: usize) -> Vec<Source> {
    (0..n)
        .map(|i| {
            Source::new(
                format!("s{}", i),
                SourceKind::SimpleFault,
                "Active Shallow Crust",
                1_000 + 37 * i,
            )
            .with_locations(vec![Location::new(i as f64 * 0.01, 0.0)])
            .with_mfd(vec![MagRate::new(6.0, 0.01)])
        })
        .collect()
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_all");

    for n in [10, 100, 1000] {
        let sources = make_sources(n);
        group.bench_with_input(BenchmarkId::new("sources", n), &sources, |b, sources| {
            b.iter(|| split_all(black_box(sources), 500.0));
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let sites = SiteCollection::from_locations(
        (0..1000).map(|i| (Location::new((i % 40) as f64 * 0.1, (i / 40) as f64 * 0.1), 760.0)),
    )
    .unwrap();
    let filter = SourceFilter::new(200.0);
    let sources = make_sources(100);

    c.bench_function("filter_100_sources_1000_sites", |b| {
        b.iter(|| {
            for src in &sources {
                black_box(filter.affected_sites(src, &sites));
            }
        });
    });
}

criterion_group!(benches, bench_split, bench_filter);
criterion_main!(benches);
