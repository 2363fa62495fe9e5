//! Generational keys for link arena slots.
//!
//! A key pairs a slot index with the generation the slot had when the
//! key was issued. Lookups compare both, giving O(1) staleness checks
//! without a side table. Slots are retired rather than wrapped once
//! their generation is exhausted, so a stale key never matches again.

use std::fmt;

use hearth_core::LinkError;

/// Key of a membership reference inside a [`LinkArena`](crate::LinkArena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct RefKey {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl RefKey {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this key was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn stale(self) -> LinkError {
        LinkError::StaleReference {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefKey(idx={}, gen={})", self.index, self.generation)
    }
}

/// Key of a container inside a [`LinkArena`](crate::LinkArena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct ContainerKey {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ContainerKey {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this key was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn stale(self) -> LinkError {
        LinkError::StaleContainer {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContainerKey(idx={}, gen={})",
            self.index, self.generation
        )
    }
}
