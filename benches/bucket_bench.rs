//! Benchmarks for archivedb bucket operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use archivedb::{Bucket, Config, Database, Meta, SyncMode};
use tempfile::TempDir;

fn setup_bench_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_mode(SyncMode::Eventual)
        .build();
    let db = Database::open(config).unwrap();
    (temp_dir, db)
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn put_benchmarks(c: &mut Criterion) {
    let (_dir, db) = setup_bench_db();
    let ns = db.create_namespace(b"bench").unwrap();
    let objects = ns.object_bucket();

    let mut group = c.benchmark_group("put");
    for &len in &[1024usize, 64 * 1024, 1024 * 1024] {
        let value = payload(len);

        group.bench_with_input(BenchmarkId::new("inline", len), &value, |b, value| {
            b.iter(|| objects.put(b"inline", black_box(value), None).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("chunked_16k", len), &value, |b, value| {
            b.iter(|| {
                let meta = Meta::new("application/octet-stream").with_chunk_size(16 * 1024);
                objects.put(b"chunked", black_box(value), Some(meta)).unwrap()
            })
        });
    }
    group.finish();

    c.bench_function("put_val/1k", |b| {
        let value = payload(1024);
        b.iter(|| objects.put_val(black_box(&value), None).unwrap())
    });
}

fn read_benchmarks(c: &mut Criterion) {
    let (_dir, db) = setup_bench_db();
    let ns = db.create_namespace(b"bench").unwrap();
    let objects = ns.object_bucket();

    let value = payload(4 * 1024 * 1024);
    let meta = Meta::new("application/octet-stream").with_chunk_size(64 * 1024);
    objects.put(b"large", &value, Some(meta)).unwrap();

    c.bench_function("get/chunked_4m", |b| {
        b.iter(|| objects.get(black_box(b"large")).unwrap())
    });

    // A ranged read only touches the chunks it overlaps
    c.bench_function("get_at/chunked_4m_16k", |b| {
        let mut buf = vec![0u8; 16 * 1024];
        b.iter(|| {
            objects
                .get_at(black_box(b"large"), &mut buf, black_box(2 * 1024 * 1024 + 100))
                .unwrap()
        })
    });
}

criterion_group!(benches, put_benchmarks, read_benchmarks);
criterion_main!(benches);
