//! Realtime heartbeat thread.
//!
//! The heartbeat thread owns its [`TickTarget`] exclusively (moved in at
//! spawn). Callers reach the target only through
//! [`Heartbeat::with_target`], whose closures travel over a crossbeam
//! channel and run on the heartbeat thread between ticks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use hearth_core::ConfigError;
use tracing::{debug, info, warn};

use crate::clock::DeltaClock;
use crate::config::HeartbeatConfig;
use crate::target::TickTarget;

type Command<T> = Box<dyn FnOnce(&mut T) + Send>;

/// How often a blocked `with_target` checks that the thread is alive.
const REPLY_POLL: Duration = Duration::from_millis(20);

/// Heartbeat counters, readable from any thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Heartbeats completed.
    pub ticks: u64,
    /// Heartbeats whose tick took longer than the budget.
    pub overruns: u64,
    /// Heartbeats whose delta hit `max_delta_ms`.
    pub clamped: u64,
    /// Sum of all deltas delivered, in virtual milliseconds.
    pub virtual_ms: u64,
    /// Wall time spent in the most recent tick, in microseconds.
    pub last_tick_us: u64,
}

#[derive(Default)]
struct StatsCell {
    ticks: AtomicU64,
    overruns: AtomicU64,
    clamped: AtomicU64,
    virtual_ms: AtomicU64,
    last_tick_us: AtomicU64,
}

impl StatsCell {
    fn snapshot(&self) -> TickStats {
        TickStats {
            ticks: self.ticks.load(Ordering::Acquire),
            overruns: self.overruns.load(Ordering::Acquire),
            clamped: self.clamped.load(Ordering::Acquire),
            virtual_ms: self.virtual_ms.load(Ordering::Acquire),
            last_tick_us: self.last_tick_us.load(Ordering::Acquire),
        }
    }
}

/// Report from the shutdown state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Time spent waiting for the heartbeat thread to leave its loop.
    pub drain_ms: u64,
    /// Whether the heartbeat thread was joined and its target recovered.
    pub thread_joined: bool,
    /// Heartbeats completed over the driver's lifetime.
    pub ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

/// A background thread ticking a [`TickTarget`] at a fixed rate.
///
/// Each heartbeat measures the wall-clock time since the previous one,
/// converts it to whole milliseconds (carrying the remainder, clamping
/// at [`max_delta_ms`](HeartbeatConfig::max_delta_ms)), and calls
/// `target.tick(delta)`. The thread then sleeps for what is left of the
/// budget with `park_timeout`, so shutdown and commands wake it at once.
///
/// Dropping a running heartbeat shuts it down.
pub struct Heartbeat<T: TickTarget> {
    cmd_tx: Option<Sender<Command<T>>>,
    shutdown_flag: Arc<AtomicBool>,
    stopped_flag: Arc<AtomicBool>,
    stats: Arc<StatsCell>,
    thread: Option<JoinHandle<T>>,
    recovered: Option<T>,
    state: ShutdownState,
    config: HeartbeatConfig,
}

impl<T: TickTarget> Heartbeat<T> {
    /// Validate `config` and start ticking `target` on a new thread.
    pub fn start(target: T, config: HeartbeatConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let stopped_flag = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(StatsCell::default());

        let state = HeartbeatLoop {
            target,
            cmd_rx,
            shutdown_flag: Arc::clone(&shutdown_flag),
            stopped_flag: Arc::clone(&stopped_flag),
            stats: Arc::clone(&stats),
            budget: config.tick_budget(),
            max_delta_ms: config.max_delta_ms,
        };
        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("{}: {e}", config.thread_name),
            })?;

        info!(
            thread = %config.thread_name,
            tick_rate_hz = config.tick_rate_hz,
            max_delta_ms = config.max_delta_ms,
            "heartbeat started"
        );
        Ok(Self {
            cmd_tx: Some(cmd_tx),
            shutdown_flag,
            stopped_flag,
            stats,
            thread: Some(thread),
            recovered: None,
            state: ShutdownState::Running,
            config,
        })
    }

    /// Current heartbeat counters.
    pub fn stats(&self) -> TickStats {
        self.stats.snapshot()
    }

    /// Whether the heartbeat thread is still ticking.
    pub fn is_running(&self) -> bool {
        self.state == ShutdownState::Running && !self.stopped_flag.load(Ordering::Acquire)
    }

    /// The configuration the heartbeat was started with.
    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Run `f` against the target between ticks and return its result.
    ///
    /// While running, `f` executes on the heartbeat thread and this call
    /// blocks until it has. After shutdown, `f` runs directly on the
    /// recovered target. Returns `None` only if the target was lost to a
    /// panic on the heartbeat thread.
    pub fn with_target<R, F>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        if let (ShutdownState::Running, Some(tx), Some(handle)) =
            (self.state, &self.cmd_tx, &self.thread)
        {
            let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
            let cmd: Command<T> = Box::new(move |target: &mut T| {
                let _ = reply_tx.send(f(target));
            });
            if tx.send(cmd).is_err() {
                return None;
            }
            handle.thread().unpark();
            // A thread that died mid-tick never drops the queued command,
            // so the reply channel would stay open forever.
            loop {
                match reply_rx.recv_timeout(REPLY_POLL) {
                    Ok(value) => return Some(value),
                    Err(RecvTimeoutError::Disconnected) => return None,
                    Err(RecvTimeoutError::Timeout) if handle.is_finished() => {
                        return reply_rx.try_recv().ok();
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
        self.recovered.as_mut().map(f)
    }

    /// Stop the heartbeat thread and recover the target.
    ///
    /// State machine: Running -> Draining -> Stopped. Idempotent; later
    /// calls return a zero-time report.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ShutdownState::Stopped {
            return ShutdownReport {
                total_ms: 0,
                drain_ms: 0,
                thread_joined: self.recovered.is_some(),
                ticks: self.stats.ticks.load(Ordering::Acquire),
            };
        }

        let start = Instant::now();

        // Running -> Draining
        self.state = ShutdownState::Draining;
        self.shutdown_flag.store(true, Ordering::Release);
        if let Some(handle) = &self.thread {
            handle.thread().unpark();
        }
        let drain_deadline = Instant::now() + Duration::from_millis(100);
        while !self.stopped_flag.load(Ordering::Acquire) && Instant::now() < drain_deadline {
            thread::yield_now();
        }
        let drain_ms = start.elapsed().as_millis() as u64;

        // Draining -> Stopped
        self.state = ShutdownState::Stopped;
        self.cmd_tx.take();
        let thread_joined = match self.thread.take() {
            Some(handle) => match handle.join() {
                Ok(target) => {
                    self.recovered = Some(target);
                    true
                }
                Err(_) => {
                    warn!("heartbeat thread panicked; target lost");
                    false
                }
            },
            None => self.recovered.is_some(),
        };

        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            drain_ms,
            thread_joined,
            ticks: self.stats.ticks.load(Ordering::Acquire),
        };
        info!(
            total_ms = report.total_ms,
            ticks = report.ticks,
            "heartbeat stopped"
        );
        report
    }

    /// Shut down (if still running) and return the target.
    pub fn into_target(mut self) -> Option<T> {
        self.shutdown();
        self.recovered.take()
    }
}

impl<T: TickTarget> Drop for Heartbeat<T> {
    fn drop(&mut self) {
        if self.state != ShutdownState::Stopped {
            self.shutdown();
        }
    }
}

/// State owned by the heartbeat thread.
struct HeartbeatLoop<T> {
    target: T,
    cmd_rx: Receiver<Command<T>>,
    shutdown_flag: Arc<AtomicBool>,
    stopped_flag: Arc<AtomicBool>,
    stats: Arc<StatsCell>,
    budget: Duration,
    max_delta_ms: u32,
}

impl<T: TickTarget> HeartbeatLoop<T> {
    /// Main loop. Runs until the shutdown flag is set, then returns the
    /// target so the handle can recover it.
    fn run(mut self) -> T {
        let mut clock = DeltaClock::new(Instant::now(), self.max_delta_ms);
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                break;
            }
            self.drain_commands();

            let tick_start = Instant::now();
            let (delta_ms, clamped) = clock.advance(tick_start);
            if clamped {
                self.stats.clamped.fetch_add(1, Ordering::AcqRel);
                debug!(delta_ms, "heartbeat delta clamped after stall");
            }
            self.target.tick(delta_ms);
            let took = tick_start.elapsed();

            self.stats.ticks.fetch_add(1, Ordering::AcqRel);
            self.stats
                .virtual_ms
                .fetch_add(u64::from(delta_ms), Ordering::AcqRel);
            self.stats
                .last_tick_us
                .store(took.as_micros() as u64, Ordering::Release);
            if took > self.budget {
                self.stats.overruns.fetch_add(1, Ordering::AcqRel);
                warn!(
                    tick_us = took.as_micros() as u64,
                    budget_us = self.budget.as_micros() as u64,
                    "heartbeat overran its budget"
                );
            }

            self.sleep_until(tick_start + self.budget);
        }
        // Commands still queued at shutdown run before the target is
        // handed back so their callers are not left waiting.
        self.drain_commands();
        self.stopped_flag.store(true, Ordering::Release);
        self.target
    }

    /// Park until `deadline`, waking early to run commands or to exit.
    fn sleep_until(&mut self, deadline: Instant) {
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                return;
            }
            self.drain_commands();
            let now = Instant::now();
            match deadline.checked_duration_since(now) {
                Some(remaining) if !remaining.is_zero() => thread::park_timeout(remaining),
                _ => return,
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            cmd(&mut self.target);
        }
    }
}
