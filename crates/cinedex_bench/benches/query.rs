//! End-to-end catalog benchmarks.

use cinedex_bench::generate_records;
use cinedex_core::{Config, IndexManager, Query, SortKey};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

fn populated(count: usize) -> (TempDir, IndexManager) {
    let dir = TempDir::new().unwrap();
    let mut manager = IndexManager::open(Config::in_dir(dir.path())).unwrap();
    for record in generate_records(count, 200) {
        manager.add_record(&record).unwrap();
    }
    (dir, manager)
}

/// Benchmark appending records through the manager.
fn bench_add_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_record");
    let records = generate_records(1_000, 50);
    group.throughput(Throughput::Elements(records.len() as u64));

    group.bench_function("1000", |b| {
        b.iter_with_setup(
            || {
                let dir = TempDir::new().unwrap();
                let manager = IndexManager::open(Config::in_dir(dir.path())).unwrap();
                (dir, manager)
            },
            |(_dir, mut manager)| {
                for record in &records {
                    manager.add_record(record).unwrap();
                }
            },
        );
    });
    group.finish();
}

/// Benchmark rebuilding every index from the store.
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    group.sample_size(10);

    for count in [1_000, 10_000] {
        let (_dir, mut manager) = populated(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| manager.rebuild_from_store().unwrap());
        });
    }
    group.finish();
}

/// Benchmark query shapes: index-only, intersections and genre scans.
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let (_dir, manager) = populated(20_000);

    let queries = [
        ("id", Query::new().id("tt0012345")),
        ("year", Query::new().year(1950)),
        ("prefix_and_range", Query::new().title_prefix("m").year_range(1950, 1990)),
        ("director_sorted", Query::new().director("Director 7").sort_by(SortKey::Year)),
        ("genre_scan", Query::new().genre("horror").year(1950)),
    ];
    for (name, query) in &queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, query| {
            b.iter(|| black_box(manager.query(query).unwrap().len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_record, bench_rebuild, bench_queries);
criterion_main!(benches);
