//! Worker pool stress and shutdown tests.
//!
//! Covers the counting barrier (`wait_idle` after many small tasks),
//! the discard-on-stop policy, and recovery from panicking tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use hearth_core::{JobError, PoolError, SubmitError};
use hearth_pool::{PoolConfig, StopReport, WorkerPool};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn started(workers: usize) -> Arc<WorkerPool> {
    let pool = WorkerPool::new(PoolConfig::default()).unwrap();
    pool.start(workers).unwrap();
    Arc::new(pool)
}

#[test]
fn thousand_increments_then_wait_idle() {
    let pool = started(4);
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..1_000 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    pool.wait_idle();
    assert_eq!(counter.load(Ordering::SeqCst), 1_000);
    assert_eq!(pool.queued(), 0);
    assert_eq!(pool.in_flight(), 0);
    assert_eq!(pool.completed(), 1_000);
}

#[test]
fn concurrent_submitters_with_jittered_tasks() {
    const SUBMITTERS: usize = 4;
    const PER_SUBMITTER: usize = 250;

    let pool = started(4);
    let counter = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..SUBMITTERS)
        .map(|s| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(s as u64);
                for _ in 0..PER_SUBMITTER {
                    let spin = rng.next_u32() % 200;
                    let counter = Arc::clone(&counter);
                    pool.submit(move || {
                        for _ in 0..spin {
                            std::hint::spin_loop();
                        }
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    pool.wait_idle();
    assert_eq!(counter.load(Ordering::SeqCst), SUBMITTERS * PER_SUBMITTER);
}

#[test]
fn stop_discards_queued_tasks_and_joins() {
    let pool = started(1);
    let gate = Arc::new(Barrier::new(2));
    let ran = Arc::new(AtomicUsize::new(0));

    // Occupy the only worker until the queue is full.
    {
        let gate = Arc::clone(&gate);
        pool.submit(move || {
            gate.wait();
            thread::sleep(Duration::from_millis(20));
        })
        .unwrap();
    }
    let receipts: Vec<_> = (0..10)
        .map(|_| {
            let ran = Arc::clone(&ran);
            pool.submit_with_reply(move || ran.fetch_add(1, Ordering::SeqCst))
                .unwrap()
        })
        .collect();
    gate.wait();

    let report = pool.stop();
    assert_eq!(report.workers_joined, 1);
    assert_eq!(report.discarded, 10);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    for r in receipts {
        assert_eq!(r.wait(), Err(JobError::Dropped));
    }
    assert_eq!(pool.submit(|| {}), Err(SubmitError::Frozen));
}

#[test]
fn start_is_refused_until_stop_has_joined_workers() {
    let pool = started(2);
    let gate = Arc::new(Barrier::new(3));
    for _ in 0..2 {
        let gate = Arc::clone(&gate);
        pool.submit(move || {
            gate.wait();
            thread::sleep(Duration::from_millis(300));
        })
        .unwrap();
    }
    gate.wait();

    let (tx, rx) = crossbeam_channel::bounded(1);
    {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let _ = tx.send(pool.stop());
        });
    }
    // Handles leave the pool as soon as stop starts joining them.
    let deadline = Instant::now() + Duration::from_secs(3);
    while pool.is_running() {
        assert!(Instant::now() < deadline, "stop never began");
        thread::yield_now();
    }

    assert_eq!(pool.start(1), Err(PoolError::Stopping));
    assert_eq!(pool.stop(), StopReport::default(), "overlapping stop waits");

    let report = rx
        .recv_timeout(Duration::from_secs(3))
        .expect("stop returned");
    assert_eq!(report.workers_joined, 2);

    pool.start(1).unwrap();
    assert_eq!(pool.submit_with_reply(|| 5).unwrap().wait(), Ok(5));
}

#[test]
fn wait_idle_released_by_stop() {
    // No workers: queued tasks can only leave the queue through stop().
    let pool = Arc::new(WorkerPool::new(PoolConfig::default()).unwrap());
    for _ in 0..5 {
        pool.submit(|| {}).unwrap();
    }
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.wait_idle())
    };
    thread::sleep(Duration::from_millis(20));
    assert_eq!(pool.stop().discarded, 5);
    waiter.join().unwrap();
}

#[test]
fn panicking_tasks_do_not_wedge_wait_idle() {
    let pool = started(2);
    let ok = Arc::new(AtomicUsize::new(0));
    for i in 0..100 {
        let ok = Arc::clone(&ok);
        pool.submit(move || {
            if i % 10 == 0 {
                panic!("task {i} failed");
            }
            ok.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    assert!(pool.wait_idle_timeout(Duration::from_secs(10)));
    assert_eq!(ok.load(Ordering::SeqCst), 90);
    assert_eq!(pool.panicked(), 10);
    assert_eq!(pool.completed(), 100);
    assert_eq!(pool.worker_count(), 2);
}

#[test]
fn drain_and_stop_runs_everything() {
    let pool = started(3);
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..200 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    let report = pool.drain_and_stop();
    assert_eq!(report.discarded, 0);
    assert_eq!(report.workers_joined, 3);
    assert_eq!(counter.load(Ordering::SeqCst), 200);
}

#[test]
fn workers_carry_configured_names() {
    let pool = WorkerPool::new(PoolConfig {
        worker_count: Some(2),
        thread_name_prefix: "db-writer".into(),
    })
    .unwrap();
    pool.start_default().unwrap();
    let name = pool
        .submit_with_reply(|| thread::current().name().map(str::to_owned))
        .unwrap()
        .wait()
        .unwrap()
        .unwrap();
    assert!(name.starts_with("db-writer-"), "unexpected name {name}");
}
