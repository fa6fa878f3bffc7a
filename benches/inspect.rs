//! Benchmarks for jemscope.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jemscope::diagnostics::suppress_diagnostics;
use jemscope::{BuiltinLayouts, InspectConfig, Inspector, MemoryImage};

#[path = "../tests/common/mod.rs"]
mod common;

use common::*;

fn inspector(config: InspectConfig) -> Inspector<MemoryImage> {
    Inspector::detect(heap_image(), &BuiltinLayouts, config).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    suppress_diagnostics(true);
    let mut group = c.benchmark_group("parse");

    let shallow = inspector(InspectConfig::manual());
    group.bench_function("chunks_and_runs", |b| {
        b.iter(|| shallow.parse().unwrap())
    });

    let deep = inspector(InspectConfig::manual());
    group.bench_function("with_arenas_and_tcaches", |b| {
        b.iter(|| deep.parse_all().unwrap())
    });

    group.finish();
}

fn bench_get_info(c: &mut Criterion) {
    suppress_diagnostics(true);
    let mut group = c.benchmark_group("get_info");

    let addresses = [
        ("region", run_data(SMALL_RUN_BIN1) + 0x24),
        ("large_run", run_data(LARGE_RUN) + 0x800),
        ("chunk_header", CHUNK + 0x40),
        ("miss", 0x1000),
    ];

    let inspector = inspector(InspectConfig::manual());
    inspector.parse().unwrap();
    for (name, address) in addresses {
        group.bench_with_input(BenchmarkId::new("classify", name), &address, |b, &address| {
            b.iter(|| black_box(inspector.get_info(black_box(address)).unwrap()))
        });
    }

    // Includes one rescan every 100 queries.
    let batch = 1000u64;
    let refreshing = inspector(InspectConfig::default().with_refresh_threshold(100));
    refreshing.parse().unwrap();
    group.throughput(Throughput::Elements(batch));
    group.bench_function("with_rescans_1000x", |b| {
        b.iter(|| {
            for i in 0..batch {
                black_box(refreshing.get_info(run_data(SMALL_RUN_BIN0) + i * 0x10).unwrap());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_get_info);
criterion_main!(benches);
