//! Engine-level benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kvtxn_bench::{generate_records, loaded_optimistic};
use kvtxn_engine::{OptimisticTransactionOptions, ReadOptions, WriteOptions};

/// Benchmark a full scan of a transaction's merged view.
fn bench_iterate(c: &mut Criterion) {
    let records = generate_records(1_000, 64);
    let db = loaded_optimistic(&records);

    c.bench_function("iterate_1000", |b| {
        let txn = db.begin_transaction(
            &WriteOptions::default(),
            &OptimisticTransactionOptions::default(),
        );
        let opts = ReadOptions::default();
        b.iter(|| {
            let count = txn.iter(&opts).unwrap().count();
            black_box(count);
        });
    });
}

/// Benchmark savepoint set and rollback over a small batch.
fn bench_savepoints(c: &mut Criterion) {
    let records = generate_records(16, 32);
    let db = loaded_optimistic(&[]);

    c.bench_function("savepoint_rollback_16", |b| {
        let mut txn = db.begin_transaction(
            &WriteOptions::default(),
            &OptimisticTransactionOptions::default(),
        );
        b.iter(|| {
            txn.set_savepoint();
            for (k, v) in &records {
                txn.put(k, v).unwrap();
            }
            txn.rollback_to_savepoint().unwrap();
        });
    });
}

/// Benchmark reads with checksum verification on and off.
fn bench_verify_checksums(c: &mut Criterion) {
    let records = generate_records(1_000, 1024);
    let db = loaded_optimistic(&records);
    let mut group = c.benchmark_group("verify_checksums");

    for verify in [true, false] {
        let opts = ReadOptions {
            verify_checksums: verify,
            fill_cache: false,
            ..ReadOptions::default()
        };
        group.bench_function(if verify { "on" } else { "off" }, |b| {
            let mut i = 0;
            b.iter(|| {
                let (k, _) = &records[i % records.len()];
                i += 1;
                black_box(db.get(&opts, k).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_iterate, bench_savepoints, bench_verify_checksums);
criterion_main!(benches);
