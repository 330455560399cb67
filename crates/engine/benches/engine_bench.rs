//! 엔진 벤치마크
//!
//! 캐시 조회/삽입, 배치 분할, 매니페스트 수집 처리량을 측정합니다.

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vulnlens_core::pipeline::Collector;
use vulnlens_core::types::{DependencyIdentity, Ecosystem};
use vulnlens_engine::collector::{GolangCollector, NpmCollector, PypiCollector};
use vulnlens_engine::{CacheStore, slice_batches};

fn keys(n: usize) -> Vec<DependencyIdentity> {
    (0..n)
        .map(|i| DependencyIdentity::new(format!("package-{i}"), format!("1.{i}.0")))
        .collect()
}

fn package_json(n: usize) -> String {
    let deps: Vec<String> = (0..n)
        .map(|i| format!("    \"package-{i}\": \"^1.{i}.0\""))
        .collect();
    format!("{{\n  \"dependencies\": {{\n{}\n  }}\n}}\n", deps.join(",\n"))
}

fn requirements(n: usize) -> String {
    (0..n).map(|i| format!("package-{i}==1.{i}.0\n")).collect()
}

fn go_mod(n: usize) -> String {
    let reqs: String = (0..n)
        .map(|i| format!("\tgithub.com/org/package-{i} v1.{i}.0\n"))
        .collect();
    format!("module example.com/app\n\ngo 1.21\n\nrequire (\n{reqs})\n")
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_store");

    for size in [100usize, 1000, 10000] {
        let items = keys(size);
        let mut store = CacheStore::new(size, Duration::from_secs(3600));
        store.add(items.iter().cloned().map(|k| (k, ())));

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("get_all_hits", size), &items, |b, items| {
            b.iter(|| store.get(black_box(items)))
        });

        group.bench_with_input(
            BenchmarkId::new("add_with_eviction", size),
            &items,
            |b, items| {
                b.iter(|| {
                    let mut store = CacheStore::new(size / 2, Duration::from_secs(3600));
                    store.add(black_box(items).iter().cloned().map(|k| (k, ())))
                })
            },
        );
    }

    group.finish();
}

fn bench_slice_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_batches");
    let items = keys(5000);

    for batch_size in [1usize, 5, 10] {
        group.throughput(Throughput::Elements(items.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| b.iter(|| slice_batches(Ecosystem::Npm, black_box(&items), batch_size)),
        );
    }

    group.finish();
}

fn bench_collectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_200_dependencies");
    group.throughput(Throughput::Elements(200));

    let npm = package_json(200);
    group.bench_function("package_json", |b| {
        b.iter(|| NpmCollector.collect(black_box(&npm)).unwrap())
    });

    let pypi = requirements(200);
    group.bench_function("requirements_txt", |b| {
        b.iter(|| PypiCollector.collect(black_box(&pypi)).unwrap())
    });

    let golang = go_mod(200);
    group.bench_function("go_mod", |b| {
        b.iter(|| GolangCollector.collect(black_box(&golang)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_cache, bench_slice_batches, bench_collectors);
criterion_main!(benches);
