//! Error types for the Hearth world-server core.
//!
//! Organised by subsystem: membership links, worker pool submission and
//! lifecycle, reply-carrying jobs, and configuration. Conditions that
//! are not errors (an already-unlinked reference, a re-entrant kill-all)
//! are reported through return values instead.

use thiserror::Error;

/// Errors from membership-reference operations on a `LinkArena`.
///
/// Keys are generational: once the slot behind a key is freed, every
/// copy of that key fails with one of these instead of aliasing the
/// slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The reference key points at a freed or reused slot.
    #[error("stale reference key: slot {index} generation {generation}")]
    StaleReference {
        /// Slot index encoded in the key.
        index: u32,
        /// Generation encoded in the key.
        generation: u32,
    },
    /// The container key points at a freed or reused slot.
    #[error("stale container key: slot {index} generation {generation}")]
    StaleContainer {
        /// Slot index encoded in the key.
        index: u32,
        /// Generation encoded in the key.
        generation: u32,
    },
}

/// A task was not accepted by the worker pool.
///
/// Callers must treat a rejected task as "not executed", never as
/// "executed and failed". The task is dropped without running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The pool has been stopped and its queue frozen.
    #[error("worker pool queue is frozen")]
    Frozen,
}

/// Errors from worker pool lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// `start()` was called on a running pool.
    #[error("worker pool already started with {workers} workers")]
    AlreadyStarted {
        /// Number of workers currently running.
        workers: usize,
    },
    /// `start()` was called while a `stop()` is still joining workers.
    #[error("worker pool is still stopping")]
    Stopping,
    /// `start(0)` would create a pool that never drains its queue.
    #[error("worker pool needs at least one worker")]
    ZeroWorkers,
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {reason}")]
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

/// A reply-carrying job never delivered its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum JobError {
    /// The job was discarded by `stop()` before a worker dequeued it,
    /// or the job panicked.
    #[error("job was dropped before producing a result")]
    Dropped,
}

/// Errors detected while validating configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Heartbeat rate is NaN, infinite, zero, negative, or so small that
    /// its period is not representable.
    #[error("tick_rate_hz must be finite and positive, got {value}")]
    InvalidTickRate {
        /// The invalid value.
        value: f64,
    },
    /// The per-heartbeat delta clamp is zero.
    #[error("max_delta_ms must be at least 1")]
    InvalidMaxDelta,
    /// An explicit worker count of zero.
    #[error("worker_count must be at least 1")]
    ZeroWorkers,
    /// A background thread could not be spawned.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}
