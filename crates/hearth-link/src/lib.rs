//! Generational membership references for Hearth.
//!
//! A membership reference records "member X currently belongs to
//! container Y". References form an intrusive doubly-linked sibling
//! chain per container, so linking and unlinking are O(1) and a
//! container's occupancy is a counter read, never a scan.
//!
//! # Architecture
//!
//! ```text
//! LinkArena<C, M>
//! ├── Slab<ContainerEntry<C>>   (payload, chain head, size)
//! └── Slab<RefEntry<M>>         (payload, container back-index, prev/next)
//!
//! CellGrid<E>                   (spatial specialisation)
//! ├── LinkArena<CellId, E>
//! └── IndexMap<CellId, ContainerKey>
//! ```
//!
//! Both sides are addressed through generational keys ([`RefKey`],
//! [`ContainerKey`]). Freeing a slot bumps its generation, so a key that
//! outlives its slot fails lookups with a
//! [`LinkError`](hearth_core::LinkError) rather than aliasing whatever
//! occupies the slot next.
//!
//! # Destruction order
//!
//! - Destroying a reference unlinks it first (O(1)).
//! - Destroying a container invalidates every member reference; the
//!   references stay alive, unlinked, until their owners destroy them.
//!
//! # Thread safety
//!
//! `LinkArena` is `Send` but not internally synchronised. Callers
//! serialise mutation per arena, typically with a `Mutex` owned by the
//! map region that holds the grid.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod grid;
pub mod key;
mod slab;

pub use arena::{LinkArena, Members, ScopedRef};
pub use grid::{CellGrid, GridRef};
pub use key::{ContainerKey, RefKey};
