//! Benchmarks for save rewrites and entry reads

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use sharppack::{PackFile, PackFileBuilder};
use std::path::Path;
use tempfile::TempDir;

fn build_pack(path: &Path, count: usize, size: usize) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut pack = PackFileBuilder::new()
        .path(path)
        .sync_on_save(false)
        .build()
        .unwrap();

    for i in 0..count {
        let data: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        pack.add(&format!("entry-{i}"), &data);
    }
    pack.save().unwrap();
}

fn benchmark_save_after_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_after_update");

    for count in [10, 100, 1000].iter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bench.pck");
        build_pack(&path, *count, 1024);

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                let mut pack = PackFileBuilder::new()
                    .path(&path)
                    .sync_on_save(false)
                    .load()
                    .unwrap();
                pack.update("entry-0", black_box(&[7u8; 2048]));
                pack.save().unwrap();
            });
        });
    }

    group.finish();
}

fn benchmark_read_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_all");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.pck");
    build_pack(&path, 100, 4096);

    group.bench_function("disk", |b| {
        let mut pack = PackFile::open_and_load(&path).unwrap();
        b.iter(|| black_box(pack.read_all("entry-50", false).unwrap()));
    });

    group.bench_function("cached", |b| {
        let mut pack = PackFile::open_and_load(&path).unwrap();
        pack.cache("entry-50").unwrap();
        b.iter(|| black_box(pack.read_all("entry-50", false).unwrap()));
    });

    group.finish();
}

fn benchmark_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    for count in [100, 10000].iter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bench.pck");
        build_pack(&path, *count, 16);

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| black_box(PackFile::open_and_load(&path).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_save_after_update,
    benchmark_read_all,
    benchmark_load
);
criterion_main!(benches);
