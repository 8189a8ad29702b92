//! Performance benchmarks for tether-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tether_engine::{validate_record_key, InMemoryStorage, LocalStorage, Record};

const ID: &str = "identity-1";
const DS: &str = "notes";

fn populate(store: &InMemoryStorage, count: usize, modified: bool) {
    let records: Vec<Record> = (0..count)
        .map(|i| {
            Record::new(
                format!("key_{}", i),
                Some(format!("value_{}", i)),
                1,
                1000,
                modified,
            )
        })
        .collect();
    store.put_records(ID, DS, &records).unwrap();
}

fn bench_store_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_operations");

    group.bench_function("put_value", |b| {
        let store = InMemoryStorage::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            store.put_value(ID, DS, &format!("key_{}", i), Some(black_box("value")))
        })
    });

    group.bench_function("get_record", |b| {
        let store = InMemoryStorage::new();
        populate(&store, 1000, false);
        b.iter(|| store.get_record(ID, DS, black_box("key_500")))
    });

    for size in [100, 1000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("get_modified_records", size),
            &size,
            |b, &size| {
                let store = InMemoryStorage::new();
                populate(&store, size, true);
                b.iter(|| store.get_modified_records(ID, DS))
            },
        );
    }

    group.finish();
}

fn bench_conflict_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict_scan");

    // The per-record work of the reconciliation conflict scan: look up
    // the local counterpart and compare values.
    for size in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("scan", size), &size, |b, &size| {
            let store = InMemoryStorage::new();
            populate(&store, size, true);
            let pulled: Vec<Record> = (0..size)
                .map(|i| {
                    Record::new(
                        format!("key_{}", i),
                        Some(format!("other_{}", i)),
                        2,
                        2000,
                        false,
                    )
                })
                .collect();

            b.iter(|| {
                let mut conflicts = 0usize;
                for remote in &pulled {
                    if let Some(local) = store.get_record(ID, DS, &remote.key).unwrap() {
                        if local.modified && local.value != remote.value {
                            conflicts += 1;
                        }
                    }
                }
                black_box(conflicts)
            })
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    c.bench_function("validate_record_key", |b| {
        b.iter(|| validate_record_key(black_box("a-reasonably-long-record-key")))
    });
}

criterion_group!(
    benches,
    bench_store_operations,
    bench_conflict_scan,
    bench_validation
);
criterion_main!(benches);
