//! Performance benchmarks for coedit-engine

use coedit_engine::{
    ChangeValue, InsertItem, JsonDocument, Operation, ReconciliationEngine, Registry,
    VersionedOperation,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use serde_json::json;

type Engine = ReconciliationEngine<JsonDocument>;

fn log_document() -> JsonDocument {
    JsonDocument::from_value(json!({"info": {"title": "Bench"}, "log": []}))
}

fn append(version: u64) -> VersionedOperation<JsonDocument> {
    VersionedOperation::remote(
        Box::new(InsertItem::new("/log", usize::MAX, version)),
        version,
        "remote",
    )
}

/// An engine holding `size` finalized appends at even versions 2, 4, ...
fn populated(size: u64) -> Engine {
    let mut engine = Engine::new(log_document());
    for i in 1..=size {
        engine.submit(append(i * 2)).unwrap();
    }
    engine
}

fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");

    // Benchmark in-order arrival (no rewind)
    group.bench_function("in_order", |b| {
        let mut engine = Engine::new(log_document());
        let mut version = 0u64;

        b.iter(|| {
            version += 1;
            engine.submit(black_box(append(version)))
        })
    });

    // Late arrival replays the whole tail
    for size in [10u64, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::new("late_arrival", size), size, |b, &size| {
            b.iter_batched(
                || populated(size),
                |mut engine| {
                    engine.submit(black_box(append(1))).unwrap();
                    engine
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_pending(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending");

    for size in [10u64, 100].iter() {
        // Remote arrival while local edits are in flight
        group.bench_with_input(BenchmarkId::new("remote_under_pending", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let mut engine = populated(100);
                    for id in 0..size {
                        let op = ChangeValue::new(format!("/draft/{}", id), id);
                        engine
                            .submit_pending(VersionedOperation::pending(Box::new(op), 10_000 + id, "me"))
                            .unwrap();
                    }
                    engine
                },
                |mut engine| {
                    engine.submit(black_box(append(1_000))).unwrap();
                    engine
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("finalize_fast_path", |b| {
        b.iter_batched(
            || {
                let mut engine = populated(100);
                let op = ChangeValue::title("mine");
                engine
                    .submit_pending(VersionedOperation::pending(Box::new(op), 10_000, "me"))
                    .unwrap();
                engine
            },
            |mut engine| {
                engine.finalize_local(black_box(10_000), 1_000).unwrap();
                engine
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("finalize_slow_path", |b| {
        b.iter_batched(
            || {
                let mut engine = populated(100);
                let op = ChangeValue::title("mine");
                engine
                    .submit_pending(VersionedOperation::pending(Box::new(op), 10_000, "me"))
                    .unwrap();
                engine
            },
            |mut engine| {
                engine.finalize_local(black_box(10_000), 1).unwrap();
                engine
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_undo(c: &mut Criterion) {
    let mut group = c.benchmark_group("undo");

    for size in [10u64, 100, 500].iter() {
        // Undo of the oldest entry re-derives everything after it
        group.bench_with_input(BenchmarkId::new("deep_in_history", size), size, |b, &size| {
            let mut engine = populated(size);
            b.iter(|| {
                engine.undo(black_box(2));
                engine.redo(black_box(2))
            })
        });
    }

    group.bench_function("undo_redo_last_local", |b| {
        let mut engine = populated(100);
        engine
            .submit(VersionedOperation::new(
                Box::new(ChangeValue::title("mine")),
                1,
                "me",
                true,
            ))
            .unwrap();

        b.iter(|| {
            engine.undo_last_local();
            engine.redo_last_local()
        })
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    let registry = Registry::standard();

    group.bench_function("operation_to_json", |b| {
        let op = ChangeValue::new("/paths/~1pets/get/summary", "List pets");
        b.iter(|| black_box(&op).to_portable().unwrap().to_json())
    });

    group.bench_function("operation_from_json", |b| {
        let json = r#"{"type":"changeValue","path":"/paths/~1pets/get/summary","value":"List pets"}"#;
        b.iter(|| registry.decode_json(black_box(json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_submit,
    bench_pending,
    bench_undo,
    bench_serialization,
);

criterion_main!(benches);
