//! Benchmarks for broker subscription and delivery.
//!
//! Run with: cargo bench -p tether-runtime --bench broker_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::cell::Cell;
use std::hint::black_box;
use tether_core::WeakHandle;
use tether_runtime::{CanExecuteChanged, Command, Listener, UiContext};

struct Counter {
    hits: Cell<u64>,
}

fn setup(listeners: usize) -> (UiContext, WeakHandle<Command>, Vec<WeakHandle<Counter>>) {
    let mut ctx = UiContext::new();
    let cmd = ctx.alloc(Command::new("bench"));
    let mut targets = Vec::with_capacity(listeners);
    for _ in 0..listeners {
        let target = ctx.alloc(Counter { hits: Cell::new(0) });
        let listener = Listener::<CanExecuteChanged>::bound(target, |c: &Counter, _, _| {
            c.hits.set(c.hits.get() + 1);
        });
        ctx.add_handler::<CanExecuteChanged>(cmd, &listener)
            .expect("fresh objects are alive");
        targets.push(target);
    }
    (ctx, cmd, targets)
}

// =============================================================================
// Delivery
// =============================================================================

fn bench_fire(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker/fire");

    for n in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(n as u64));
        let (ctx, cmd, _targets) = setup(n);
        group.bench_with_input(BenchmarkId::new("listeners", n), &n, |b, _| {
            b.iter(|| {
                let command = ctx.heap().get(cmd).expect("alive");
                command.raise_can_execute_changed(black_box(ctx.heap()));
            })
        });
    }

    group.finish();
}

// =============================================================================
// Subscribe / unsubscribe
// =============================================================================

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker/add_remove");

    group.bench_function("single_pair", |b| {
        let (mut ctx, cmd, _) = setup(0);
        let target = ctx.alloc(Counter { hits: Cell::new(0) });
        let listener = Listener::<CanExecuteChanged>::bound(target, |_: &Counter, _, _| {});
        b.iter(|| {
            ctx.add_handler::<CanExecuteChanged>(cmd, &listener).expect("alive");
            black_box(ctx.remove_handler::<CanExecuteChanged>(cmd, &listener))
        })
    });

    group.finish();
}

// =============================================================================
// Purge
// =============================================================================

fn bench_cleanup(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker/cleanup");

    for n in [16usize, 256] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("half_dead", n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let (mut ctx, cmd, targets) = setup(n);
                    for target in targets.iter().step_by(2) {
                        ctx.release(*target);
                    }
                    ctx.broker::<CanExecuteChanged>().schedule_cleanup();
                    (ctx, cmd)
                },
                |(mut ctx, cmd)| {
                    black_box(ctx.process_idle());
                    (ctx, cmd)
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fire, bench_add_remove, bench_cleanup);
criterion_main!(benches);
