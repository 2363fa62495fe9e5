//! Worker pool for Hearth.
//!
//! Blocking work (database writes, script loads, path precomputation)
//! is handed to a fixed set of OS threads so the simulation tick never
//! waits on it.
//!
//! # Architecture
//!
//! ```text
//!  submit() ──> FreezableQueue<Task> ──pop()──> worker "hearth-worker-0"
//!                  (Mutex + Condvar)    ──pop()──> worker "hearth-worker-1"
//!                                       ──pop()──> ...
//!
//!  wait_idle() waits on the outstanding-task counter
//!  stop()      freezes the queue, discards what is left, joins workers
//! ```
//!
//! Tasks are dequeued in FIFO order and complete in any order. Once
//! [`WorkerPool::stop`] freezes the queue, further submissions fail with
//! [`SubmitError::Frozen`](hearth_core::SubmitError::Frozen) until the
//! pool is started again.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod pool;
pub mod queue;

pub use config::PoolConfig;
pub use pool::{JobReceipt, StopReport, WorkerPool};
pub use queue::FreezableQueue;
