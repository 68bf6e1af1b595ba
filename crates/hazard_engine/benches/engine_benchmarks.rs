//! Criterion benchmarks for hazard_engine.
//!
//! Measures the classical kernel, probability-map merging and task packing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hazard_core::types::{GroupId, Imtls, Location};
use hazard_engine::kernel::{compute, CalcContext, KernelParams};
use hazard_engine::pmap::ProbabilityMap;
use hazard_engine::scheduler::first_fit_decreasing;
use hazard_engine::wire::TaskInput;
use hazard_sources::gsim::{LinearLogCoeffs, LinearLogModel};
use hazard_sources::{GsimRegistry, MagRate, SiteCollection, Source, SourceKind};
use std::sync::Arc;

fn context(num_sites: usize) -> CalcContext {
    let sites = SiteCollection::from_locations(
        (0..num_sites)
            .map(|i| (Location::new(0.01 * i as f64, 0.0), 760.0))
            .collect(),
    )
    .unwrap();
    let model = LinearLogModel::new("LinearLog").with_imt("PGA", LinearLogCoeffs::default());
    CalcContext {
        sites: Arc::new(sites),
        imtls: Imtls::builder()
            .imt("PGA", vec![0.005, 0.01, 0.05, 0.1, 0.2, 0.4, 0.8, 1.6])
            .build()
            .unwrap(),
        registry: GsimRegistry::builder().register(Arc::new(model)).build(),
        params: KernelParams {
            investigation_time: 50.0,
            truncation_level: Some(3.0),
            maximum_distance: 200.0,
        },
    }
}

fn fault(id: usize, nodes: usize) -> Source {
    Source::new(format!("f{id}"), SourceKind::SimpleFault, "ASC", nodes * 10)
        .with_locations(
            (0..nodes)
                .map(|i| Location::with_depth(0.02 * i as f64, 0.1, 8.0))
                .collect(),
        )
        .with_mfd((0..10).map(|k| MagRate::new(5.0 + 0.2 * k as f64, 0.01 / (k + 1) as f64)).collect())
}

fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");

    for num_sites in [10, 100, 500] {
        let ctx = context(num_sites);
        let input = TaskInput {
            grp_id: GroupId(0),
            gsims: vec!["LinearLog".into()],
            sources: (0..4).map(|i| fault(i, 8)).collect(),
        };
        group.bench_with_input(BenchmarkId::new("sites", num_sites), &input, |b, input| {
            b.iter(|| compute(&ctx, black_box(input)).unwrap());
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("pmap_merge");

    for num_sites in [100u32, 1000, 10000] {
        let mut a = ProbabilityMap::new(20);
        let mut other = ProbabilityMap::new(20);
        for site in 0..num_sites {
            a.insert(site, vec![0.01; 20]).unwrap();
            other.insert(site, vec![0.02; 20]).unwrap();
        }
        group.bench_with_input(BenchmarkId::new("sites", num_sites), &other, |b, other| {
            b.iter(|| a.clone().combined(black_box(other)).unwrap());
        });
    }

    group.finish();
}

fn bench_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_fit_decreasing");

    for n in [100, 1000, 10000] {
        let sources: Vec<Source> = (0..n)
            .map(|i| Source::new(format!("s{i}"), SourceKind::Point, "ASC", 1 + (i * 7919) % 97))
            .collect();
        group.bench_with_input(BenchmarkId::new("sources", n), &sources, |b, sources| {
            b.iter(|| first_fit_decreasing(black_box(sources.clone()), 500.0));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel, bench_merge, bench_packing);
criterion_main!(benches);
