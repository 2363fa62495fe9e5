//! Test utilities for Hearth development.
//!
//! Provides an [`EventLog`] that records what a scheduler did, plus the
//! event fixtures in [`fixtures`] that write into it.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::{Arc, Mutex, PoisonError};

use hearth_core::VirtualTime;

pub use fixtures::{RecordingEvent, RepeatingEvent, StickyEvent, StickyGate};

/// What happened to an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Firing {
    Executed,
    Aborted,
}

/// One recorded scheduler callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub name: String,
    pub firing: Firing,
    pub at: VirtualTime,
}

/// Shared, cloneable record of event callbacks in call order.
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, firing: Firing, at: VirtualTime) {
        self.lock().push(LogEntry {
            name: name.to_string(),
            firing,
            at,
        });
    }

    /// Names of executed events, in execution order.
    pub fn executed(&self) -> Vec<String> {
        self.names_for(Firing::Executed)
    }

    /// Names of aborted events, in abort order.
    pub fn aborted(&self) -> Vec<String> {
        self.names_for(Firing::Aborted)
    }

    /// Number of callbacks recorded for `name`.
    pub fn count(&self, name: &str, firing: Firing) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.name == name && e.firing == firing)
            .count()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn names_for(&self, firing: Firing) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.firing == firing)
            .map(|e| e.name.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
