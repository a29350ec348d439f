//! Performance benchmarks for the spy.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipespy::{FlushOptions, SnapshotOptions, Spy, StageId, StageTable, SubscriberId};
use serde_json::json;
use std::sync::Arc;

fn create_spy() -> Spy {
    Spy::new(Arc::new(StageTable::new()))
}

/// Build `width` chains of `depth` nested stages, each delivering one value.
fn populate(spy: &Spy, width: u64, depth: u64) {
    for chain in 0..width {
        let base = chain * depth;
        for level in 0..depth {
            let id = base + level;
            spy.before_subscribe(StageId(id), SubscriberId(id)).unwrap();
        }
        for level in (0..depth).rev() {
            let id = base + level;
            spy.after_subscribe(StageId(id), SubscriberId(id)).unwrap();
        }
        let leaf = base + depth - 1;
        spy.before_next(StageId(leaf), SubscriberId(leaf), json!(chain))
            .unwrap();
        spy.after_next(StageId(leaf), SubscriberId(leaf)).unwrap();
    }
}

/// Benchmark notification throughput on an established graph
fn bench_notifications(c: &mut Criterion) {
    let mut group = c.benchmark_group("notifications");

    for stages in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("next", stages), &stages, |b, &stages| {
            let spy = create_spy();
            populate(&spy, stages, 1);
            let mut i = 0u64;

            b.iter(|| {
                let id = i % stages;
                i += 1;
                spy.before_next(StageId(id), SubscriberId(id), json!(i))
                    .unwrap();
                spy.after_next(StageId(id), SubscriberId(id)).unwrap();
            });
            spy.flush(FlushOptions::values_only());
        });
    }

    group.bench_function("nested_subscribe_depth_16", |b| {
        b.iter(|| {
            let spy = create_spy();
            populate(&spy, 1, 16);
            black_box(spy.node_count());
        });
    });

    group.finish();
}

/// Benchmark snapshot construction with varying graph sizes
fn bench_snapshots(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for width in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("full", width), &width, |b, &width| {
            let spy = create_spy();
            populate(&spy, width, 4);

            b.iter(|| {
                black_box(spy.snapshot(SnapshotOptions::new()));
            });
        });

        group.bench_with_input(BenchmarkId::new("since", width), &width, |b, &width| {
            let spy = create_spy();
            populate(&spy, width, 4);
            let baseline = spy.snapshot(SnapshotOptions::new());
            spy.before_next(StageId(0), SubscriberId(0), json!("changed"))
                .unwrap();
            spy.after_next(StageId(0), SubscriberId(0)).unwrap();

            b.iter(|| {
                black_box(spy.snapshot(SnapshotOptions::new().since(&baseline)));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_notifications, bench_snapshots);
criterion_main!(benches);
