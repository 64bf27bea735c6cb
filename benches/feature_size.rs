//! Benchmarks for registry lookups and task config reconstruction
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hep_featurespec::config::{AggregatorDocument, BranchEntry, TaskConfig, TaskSpec};
use hep_featurespec::registry::{BranchRegistry, DerivedFeatureCatalog, RawIndex};
use hep_featurespec::types::parse_shape;

fn packaged_registry() -> BranchRegistry {
    BranchRegistry::new(
        Some(RawIndex::builtin().unwrap()),
        Box::new(DerivedFeatureCatalog::builtin().unwrap()),
    )
}

fn track_spec(n_aggregators: usize) -> TaskSpec {
    let aggregator = AggregatorDocument {
        input_branches: [
            "InDetTrackParticlesAuxDyn.d0",
            "InDetTrackParticlesAuxDyn.z0",
            "InDetTrackParticlesAuxDyn.definingParametersCovMatrixDiag",
        ]
        .into_iter()
        .map(BranchEntry::new)
        .collect(),
        sort_by_branch: Some(BranchEntry::new("derived.InDetTrackParticlesAuxDyn.pt")),
        max_length: 50,
        ..Default::default()
    };

    TaskSpec {
        input_features: vec![
            "EventInfoAuxDyn.eventNumber".to_string(),
            "EventInfoAuxDyn.averageInteractionsPerCrossing".to_string(),
        ],
        input_array_aggregators: vec![aggregator; n_aggregators],
        ..Default::default()
    }
}

fn bench_shape_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_parsing");

    for shape in ["()", "(-1,)", "(-1, 4)", "(-1, 1, 2)"] {
        group.bench_with_input(BenchmarkId::from_parameter(shape), shape, |b, shape| {
            b.iter(|| parse_shape(black_box(shape)))
        });
    }

    group.finish();
}

fn bench_registry_resolve(c: &mut Criterion) {
    let registry = packaged_registry();
    let mut group = c.benchmark_group("registry_resolve");

    for name in [
        "EventInfoAuxDyn.eventNumber",
        "derived.InDetTrackParticlesAuxDyn.pt",
        "Missing.branch",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), name, |b, name| {
            b.iter(|| registry.resolve(black_box(name)).is_ok())
        });
    }

    group.finish();
}

fn bench_task_config(c: &mut Criterion) {
    let registry = packaged_registry();
    let mut group = c.benchmark_group("task_config");

    for n in [1usize, 10, 50] {
        let spec = track_spec(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("from_spec", n), &spec, |b, spec| {
            b.iter(|| TaskConfig::from_spec_with(black_box(spec), &registry).unwrap())
        });

        let config = TaskConfig::from_spec_with(&spec, &registry).unwrap();
        let json = config.to_json().unwrap();
        group.bench_with_input(BenchmarkId::new("load_json", n), &json, |b, json| {
            b.iter(|| TaskConfig::from_json_str_with(black_box(json), &registry).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("input_size", n), &config, |b, config| {
            b.iter(|| black_box(config).input_size())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_shape_parsing,
    bench_registry_resolve,
    bench_task_config
);
criterion_main!(benches);
