//! Hearth: the timing and concurrency core of a persistent world server.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Hearth sub-crates. Adding `hearth` as a single dependency is enough
//! for most servers.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! use hearth::prelude::*;
//!
//! let fired = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&fired);
//!
//! let mut sched = EventScheduler::new();
//! // Regenerate every 100 ms, three times.
//! sched.add_event_in(
//!     FnEvent::new(move |_ctx| {
//!         if counter.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
//!             Outcome::Requeue { delay_ms: 100 }
//!         } else {
//!             Outcome::Done
//!         }
//!     }),
//!     100,
//! );
//!
//! let mut driver = LockstepDriver::new(sched);
//! driver.run(10, 50);
//! assert_eq!(fired.load(Ordering::SeqCst), 3);
//! assert!(driver.target().is_empty());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `hearth-core` | IDs, virtual time, error types |
//! | [`link`] | `hearth-link` | Self-unlinking membership references, cell grid |
//! | [`event`] | `hearth-event` | Timed event scheduler |
//! | [`pool`] | `hearth-pool` | Freezable queue and worker pool |
//! | [`engine`] | `hearth-engine` | Realtime heartbeat and lockstep driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core IDs, virtual time and error types (`hearth-core`).
pub use hearth_core as types;

/// Membership references and the cell grid (`hearth-link`).
///
/// [`link::LinkArena`] keeps every member in at most one container with
/// O(1) moves; [`link::CellGrid`] layers spatial cells on top of it.
pub use hearth_link as link;

/// Timed event scheduler (`hearth-event`).
///
/// Implement [`event::Event`] or wrap a closure in [`event::FnEvent`],
/// then drive an [`event::EventScheduler`] with `tick`.
pub use hearth_event as event;

/// Worker pool over a freezable FIFO queue (`hearth-pool`).
pub use hearth_pool as pool;

/// Tick drivers (`hearth-engine`).
///
/// [`engine::Heartbeat`] ticks a target from wall-clock time on its own
/// thread; [`engine::LockstepDriver`] steps it by hand.
pub use hearth_engine as engine;

/// Common imports for typical Hearth usage.
///
/// ```rust
/// use hearth::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use hearth_core::{CellId, EventId, VirtualTime};

    // Errors
    pub use hearth_core::{ConfigError, JobError, LinkError, PoolError, SubmitError};

    // Links
    pub use hearth_link::{CellGrid, ContainerKey, GridRef, LinkArena, RefKey};

    // Events
    pub use hearth_event::{Event, EventContext, EventScheduler, FnEvent, Outcome};

    // Pool
    pub use hearth_pool::{PoolConfig, WorkerPool};

    // Engine
    pub use hearth_engine::{Heartbeat, HeartbeatConfig, LockstepDriver, TickTarget};
}
