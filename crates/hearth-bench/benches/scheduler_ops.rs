//! Criterion micro-benchmarks for the timed event scheduler.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use hearth_bench::populated_scheduler;
use hearth_event::{EventScheduler, FnEvent, Outcome};

/// One 50 ms heartbeat over 10K timers spread across one second:
/// roughly 500 events due per tick.
fn bench_tick_10k(c: &mut Criterion) {
    let mut sched = populated_scheduler(10_000, 1_000, 42);
    c.bench_function("scheduler_tick_10k_50ms", |b| {
        b.iter(|| black_box(sched.tick(black_box(50))));
    });
}

/// Ticks where nothing is due: the cost of the due-split alone.
fn bench_idle_tick(c: &mut Criterion) {
    let mut sched = populated_scheduler(10_000, 1_000_000_000, 7);
    c.bench_function("scheduler_idle_tick_10k", |b| {
        b.iter(|| black_box(sched.tick(black_box(0))));
    });
}

fn bench_add_event(c: &mut Criterion) {
    c.bench_function("scheduler_add_1k", |b| {
        b.iter_batched(
            EventScheduler::new,
            |mut sched| {
                for i in 0..1_000u64 {
                    sched.add_event_in(FnEvent::new(|_| Outcome::Done), i % 97);
                }
                sched
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_kill_all(c: &mut Criterion) {
    c.bench_function("scheduler_kill_all_10k", |b| {
        b.iter_batched(
            || populated_scheduler(10_000, 1_000, 3),
            |mut sched| {
                sched.kill_all(true);
                sched
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_tick_10k,
    bench_idle_tick,
    bench_add_event,
    bench_kill_all
);
criterion_main!(benches);
