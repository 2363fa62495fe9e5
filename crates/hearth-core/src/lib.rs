//! Core types for the Hearth world-server core.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: strongly-typed
//! identifiers, the virtual clock, and every error enum.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod time;

pub use error::{ConfigError, JobError, LinkError, PoolError, SubmitError};
pub use id::{CellId, EventId};
pub use time::VirtualTime;
