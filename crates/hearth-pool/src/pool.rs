//! The worker pool and its job receipts.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use hearth_core::{ConfigError, JobError, PoolError, SubmitError};
use tracing::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::queue::FreezableQueue;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// State shared between the pool handle and its workers.
struct Shared {
    queue: FreezableQueue<Task>,
    /// Accepted tasks not yet finished or discarded.
    outstanding: Mutex<usize>,
    idle: Condvar,
    in_flight: AtomicUsize,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl Shared {
    fn begin(&self) {
        *lock(&self.outstanding) += 1;
    }

    fn finish(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut outstanding = lock(&self.outstanding);
        debug_assert!(*outstanding >= n, "outstanding task counter underflow");
        *outstanding = outstanding.saturating_sub(n);
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }
}

/// Worker handles and the stop-in-progress flag, guarded together so a
/// `start` cannot thaw the queue while old workers are still draining.
#[derive(Default)]
struct Lifecycle {
    handles: Vec<JoinHandle<()>>,
    stopping: bool,
}

/// Summary of a [`WorkerPool::stop`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Worker threads joined.
    pub workers_joined: usize,
    /// Queued tasks dropped without running.
    pub discarded: usize,
}

/// A fixed set of worker threads draining a shared FIFO of tasks.
///
/// The pool is an ordinary value: construct it, share it as
/// `Arc<WorkerPool>` or `&WorkerPool`, and stop it (or drop it) when
/// done. All methods take `&self`.
///
/// # Shutdown policy
///
/// [`stop`](Self::stop) discards tasks that no worker has dequeued yet;
/// tasks already running finish first. Use
/// [`drain_and_stop`](Self::drain_and_stop) to run everything accepted
/// so far before stopping.
///
/// `stop` joins the worker threads, so it must not be called from inside
/// a pool task. `start` fails with [`PoolError::Stopping`] until a
/// running `stop` has joined every worker.
pub struct WorkerPool {
    config: PoolConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    stopped: Condvar,
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<WorkerPool>();
};

impl WorkerPool {
    /// Create a pool with no running workers.
    ///
    /// Tasks submitted before [`start`](Self::start) are queued and run
    /// once workers exist.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            shared: Arc::new(Shared {
                queue: FreezableQueue::new(),
                outstanding: Mutex::new(0),
                idle: Condvar::new(),
                in_flight: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                panicked: AtomicU64::new(0),
            }),
            lifecycle: Mutex::new(Lifecycle::default()),
            stopped: Condvar::new(),
        })
    }

    /// Spawn `n` worker threads named `<prefix>-<index>`.
    ///
    /// Legal again once [`stop`](Self::stop) has returned; the queue
    /// accepts tasks from then on.
    pub fn start(&self, n: usize) -> Result<(), PoolError> {
        if n == 0 {
            return Err(PoolError::ZeroWorkers);
        }
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.stopping {
            return Err(PoolError::Stopping);
        }
        let workers = &mut lifecycle.handles;
        if !workers.is_empty() {
            return Err(PoolError::AlreadyStarted {
                workers: workers.len(),
            });
        }
        self.shared.queue.thaw();

        for i in 0..n {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{i}", self.config.thread_name_prefix))
                .spawn(move || worker_loop(&shared, i));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Workers spawned so far stay registered so stop()
                    // can join them.
                    error!(worker = i, error = %e, "failed to spawn pool worker");
                    return Err(PoolError::ThreadSpawnFailed {
                        reason: format!("{}-{i}: {e}", self.config.thread_name_prefix),
                    });
                }
            }
        }
        info!(workers = n, prefix = %self.config.thread_name_prefix, "worker pool started");
        Ok(())
    }

    /// Start with [`PoolConfig::resolved_worker_count`] workers.
    pub fn start_default(&self) -> Result<(), PoolError> {
        self.start(self.config.resolved_worker_count())
    }

    /// Queue a task for execution on a worker.
    ///
    /// Fails with [`SubmitError::Frozen`] after [`stop`](Self::stop); the
    /// task is dropped without running.
    pub fn submit<F>(&self, task: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.begin();
        if self.shared.queue.push(Box::new(task)).is_err() {
            self.shared.finish(1);
            warn!("task rejected: worker pool is stopped");
            return Err(SubmitError::Frozen);
        }
        Ok(())
    }

    /// Queue `f` and receive its return value through a [`JobReceipt`].
    pub fn submit_with_reply<F, R>(&self, f: F) -> Result<JobReceipt<R>, SubmitError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit(move || {
            let _ = tx.send(f());
        })?;
        Ok(JobReceipt { rx })
    }

    /// Block until every accepted task has finished or been discarded.
    ///
    /// Returns immediately when the pool is idle. Tasks queued on a pool
    /// with no workers keep this waiting until the pool is started or
    /// stopped.
    pub fn wait_idle(&self) {
        let mut outstanding = lock(&self.shared.outstanding);
        while *outstanding > 0 {
            outstanding = self
                .shared
                .idle
                .wait(outstanding)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) with an upper bound. Returns
    /// whether the pool became idle in time.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let outstanding = lock(&self.shared.outstanding);
        let (outstanding, _) = self
            .shared
            .idle
            .wait_timeout_while(outstanding, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *outstanding == 0
    }

    /// Freeze the queue, discard undequeued tasks, and join all workers.
    ///
    /// Running tasks finish first. Idempotent: a call that overlaps a
    /// running stop waits for it and returns an empty report.
    pub fn stop(&self) -> StopReport {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.stopping {
            while lifecycle.stopping {
                lifecycle = self
                    .stopped
                    .wait(lifecycle)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            return StopReport::default();
        }
        lifecycle.stopping = true;
        let discarded = self.shared.queue.freeze();
        let handles = std::mem::take(&mut lifecycle.handles);
        drop(lifecycle);

        let discarded_count = discarded.len();
        // Dropping the tasks drops their reply senders, so pending
        // receipts resolve to `JobError::Dropped`.
        drop(discarded);
        self.shared.finish(discarded_count);

        let workers_joined = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                error!("pool worker exited by panic");
            }
        }
        lock(&self.lifecycle).stopping = false;
        self.stopped.notify_all();

        if discarded_count > 0 {
            warn!(discarded = discarded_count, "stop discarded queued tasks");
        }
        if workers_joined > 0 {
            info!(workers = workers_joined, "worker pool stopped");
        }
        StopReport {
            workers_joined,
            discarded: discarded_count,
        }
    }

    /// Run everything accepted so far, then stop.
    ///
    /// On a pool with no workers there is nobody to drain the queue, so
    /// this is a plain [`stop`](Self::stop).
    pub fn drain_and_stop(&self) -> StopReport {
        if self.is_running() {
            self.wait_idle();
        }
        self.stop()
    }

    /// Number of running worker threads.
    pub fn worker_count(&self) -> usize {
        lock(&self.lifecycle).handles.len()
    }

    /// Whether worker threads are running.
    pub fn is_running(&self) -> bool {
        self.worker_count() > 0
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Tasks currently executing.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Tasks finished since the pool was created, including ones that
    /// panicked.
    pub fn completed(&self) -> u64 {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Tasks that panicked since the pool was created.
    pub fn panicked(&self) -> u64 {
        self.shared.panicked.load(Ordering::Acquire)
    }

    /// The pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.worker_count())
            .field("queued", &self.queued())
            .field("in_flight", &self.in_flight())
            .field("completed", &self.completed())
            .finish()
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    while let Some(task) = shared.queue.pop() {
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        let result = panic::catch_unwind(AssertUnwindSafe(task));
        shared.in_flight.fetch_sub(1, Ordering::AcqRel);
        if let Err(payload) = result {
            shared.panicked.fetch_add(1, Ordering::AcqRel);
            error!(worker = index, panic = panic_message(&*payload), "pool task panicked");
        }
        shared.completed.fetch_add(1, Ordering::AcqRel);
        shared.finish(1);
    }
    debug!(worker = index, "pool worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the result of a task submitted with
/// [`WorkerPool::submit_with_reply`].
pub struct JobReceipt<R> {
    rx: Receiver<R>,
}

impl<R> JobReceipt<R> {
    /// Block until the job's result arrives.
    ///
    /// Fails with [`JobError::Dropped`] if the job was discarded by
    /// `stop()` or panicked.
    pub fn wait(self) -> Result<R, JobError> {
        self.rx.recv().map_err(|_| JobError::Dropped)
    }

    /// Wait at most `timeout`. `None` means the job is still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<R, JobError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(v) => Some(Ok(v)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(JobError::Dropped)),
        }
    }

    /// Poll without blocking. `None` means the job is still pending.
    pub fn try_get(&self) -> Option<Result<R, JobError>> {
        match self.rx.try_recv() {
            Ok(v) => Some(Ok(v)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(JobError::Dropped)),
        }
    }
}

impl<R> fmt::Debug for JobReceipt<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobReceipt").finish_non_exhaustive()
    }
}
