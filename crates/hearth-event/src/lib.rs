//! Timed event scheduler for Hearth.
//!
//! Each simulated owner (a creature, a map region) keeps one
//! [`EventScheduler`]: a virtual clock plus a time-ordered set of
//! pending [`Event`]s. The simulation driver advances the clock with
//! [`EventScheduler::tick`], which runs every event that has come due.
//!
//! # Entry lifecycle
//!
//! ```text
//!            execute -> Done (not deletable)
//!   Active ────────────────────────────────> Finishing ──┐
//!     │  │                                                │ is_deletable()
//!     │  └── execute -> Requeue / RequeueAt ──> Active    ├──────────> dropped
//!     │                                                   │
//!     └── abort requested -> on_abort ──────> Aborting ───┘
//! ```
//!
//! `Finishing` and `Aborting` entries are polled once per tick and are
//! never executed again.
//!
//! # Ordering
//!
//! Pending entries are keyed by `(scheduled_time, arrival_seq)`. Events
//! due at the same virtual time run in the order they were added;
//! re-queued events count as new arrivals.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod event;
pub mod scheduler;

pub use context::EventContext;
pub use event::{AbortHandle, Event, FnEvent, Outcome};
pub use scheduler::{EventScheduler, TickReport};
