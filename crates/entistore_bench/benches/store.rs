//! Snapshot and builder benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entistore_bench::{generate_modules, module_id, module_schemas, populated_snapshot};
use entistore_core::{Builder, EntitySource};
use rand::Rng;

/// Benchmark adding entities to an empty builder.
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_entity");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (schemas, module) = module_schemas();
            let modules = generate_modules(count, 4);

            b.iter(|| {
                let mut builder = Builder::new(schemas.clone());
                for (source, fields) in &modules {
                    builder
                        .add_entity(module, *source, black_box(fields.clone()))
                        .unwrap();
                }
                builder
            });
        });
    }
    group.finish();
}

/// Benchmark a small edit followed by publishing a snapshot.
///
/// The cost should track the edit, not the store size.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_and_commit");

    for count in [1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (snapshot, _) = populated_snapshot(count, 4);
            let mut builder = snapshot.to_builder();
            let mut rng = rand::thread_rng();
            let mut round: i64 = 0;

            b.iter(|| {
                round += 1;
                let target = module_id(rng.gen_range(0..count));
                let id = builder.resolve(&target).unwrap().id();
                builder
                    .modify_entity(id, |update| {
                        update.set("touched", round);
                    })
                    .unwrap();
                black_box(builder.to_snapshot())
            });
        });
    }
    group.finish();
}

/// Benchmark symbolic id resolution.
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for count in [1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (snapshot, _) = populated_snapshot(count, 4);
            let targets: Vec<_> = (0..1_000).map(|i| module_id(i % count)).collect();

            b.iter(|| {
                for target in &targets {
                    black_box(snapshot.resolve(target));
                }
            });
        });
    }
    group.finish();
}

/// Benchmark reverse reference lookup.
fn bench_referrers(c: &mut Criterion) {
    let mut group = c.benchmark_group("referrers");

    for count in [1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (snapshot, module) = populated_snapshot(count, 4);
            let targets: Vec<_> = (0..100).map(module_id).collect();

            b.iter(|| {
                let mut total = 0;
                for target in &targets {
                    total += snapshot.referrers(target, module).count();
                }
                black_box(total)
            });
        });
    }
    group.finish();
}

/// Benchmark replacing the entities of one source with a fresh import.
fn bench_replace_by_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace_by_source");
    group.sample_size(20);

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (schemas, module) = module_schemas();
            let modules = generate_modules(count, 4);

            let mut base = Builder::new(schemas.clone());
            let mut import = Builder::new(schemas);
            for (index, (source, fields)) in modules.iter().enumerate() {
                base.add_entity(module, *source, fields.clone()).unwrap();
                let fields = if index % 10 == 0 {
                    fields.clone().with("touched", true)
                } else {
                    fields.clone()
                };
                import.add_entity(module, *source, fields).unwrap();
            }
            let base = base.to_snapshot();
            let gradle = EntitySource::new("gradle");

            b.iter(|| {
                let mut builder = base.to_builder();
                let summary = builder
                    .replace_by_source(|source| *source == gradle, &import)
                    .unwrap();
                black_box(summary)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add,
    bench_commit,
    bench_resolve,
    bench_referrers,
    bench_replace_by_source,
);
criterion_main!(benches);
