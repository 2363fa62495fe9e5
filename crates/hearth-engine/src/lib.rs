//! Simulation drivers for Hearth.
//!
//! A driver turns elapsed time into calls to
//! [`TickTarget::tick`]. Two modes are provided:
//!
//! - [`Heartbeat`]: a background thread that measures wall-clock time
//!   and ticks its target once per heartbeat.
//! - [`LockstepDriver`]: the caller supplies every delta explicitly,
//!   for tests and offline simulation.
//!
//! # Heartbeat loop
//!
//! ```text
//!   ┌─> drain commands ─> delta = wall ms since last beat (clamped)
//!   │                          │
//!   │                     target.tick(delta)
//!   │                          │
//!   └── park_timeout(remaining budget) <──┘     unpark() on shutdown
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod clock;
pub mod config;
pub mod heartbeat;
pub mod lockstep;
pub mod target;

pub use config::HeartbeatConfig;
pub use heartbeat::{Heartbeat, ShutdownReport, TickStats};
pub use lockstep::LockstepDriver;
pub use target::{TickFn, TickTarget};
