//! Reusable event fixtures.
//!
//! - [`RecordingEvent`]: logs one execution and finishes.
//! - [`RepeatingEvent`]: re-queues itself on a fixed period.
//! - [`StickyEvent`]: finishes but refuses deletion until released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hearth_event::{Event, EventContext, Outcome};

use crate::{EventLog, Firing};

/// Records each execution and abort under `name`, then finishes.
pub struct RecordingEvent {
    pub name: String,
    log: EventLog,
}

impl RecordingEvent {
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
        }
    }
}

impl Event for RecordingEvent {
    fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome {
        self.log.record(&self.name, Firing::Executed, ctx.now());
        Outcome::Done
    }

    fn on_abort(&mut self, ctx: &mut EventContext<'_>) {
        self.log.record(&self.name, Firing::Aborted, ctx.now());
    }
}

/// Fires every `period_ms`, optionally a limited number of times.
pub struct RepeatingEvent {
    pub name: String,
    pub period_ms: u64,
    remaining: Option<u32>,
    log: EventLog,
}

impl RepeatingEvent {
    /// Repeats until aborted.
    pub fn forever(name: impl Into<String>, period_ms: u64, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            period_ms,
            remaining: None,
            log: log.clone(),
        }
    }

    /// Fires exactly `times` times, then finishes.
    pub fn times(name: impl Into<String>, period_ms: u64, times: u32, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            period_ms,
            remaining: Some(times),
            log: log.clone(),
        }
    }
}

impl Event for RepeatingEvent {
    fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome {
        self.log.record(&self.name, Firing::Executed, ctx.now());
        if let Some(n) = &mut self.remaining {
            *n = n.saturating_sub(1);
            if *n == 0 {
                return Outcome::Done;
            }
        }
        Outcome::Requeue {
            delay_ms: self.period_ms,
        }
    }

    fn on_abort(&mut self, ctx: &mut EventContext<'_>) {
        self.log.record(&self.name, Firing::Aborted, ctx.now());
    }
}

/// Releases a [`StickyEvent`] for deletion.
#[derive(Clone, Default)]
pub struct StickyGate(Arc<AtomicBool>);

impl StickyGate {
    pub fn release(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Finishes on first execution but is not deletable until its
/// [`StickyGate`] is released, the way a spell that still has a
/// projectile in flight must outlive its own completion.
pub struct StickyEvent {
    pub name: String,
    gate: StickyGate,
    log: EventLog,
}

impl StickyEvent {
    pub fn new(name: impl Into<String>, log: &EventLog) -> (Self, StickyGate) {
        let gate = StickyGate::default();
        let event = Self {
            name: name.into(),
            gate: gate.clone(),
            log: log.clone(),
        };
        (event, gate)
    }
}

impl Event for StickyEvent {
    fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome {
        self.log.record(&self.name, Firing::Executed, ctx.now());
        Outcome::Done
    }

    fn is_deletable(&self) -> bool {
        self.gate.is_released()
    }

    fn on_abort(&mut self, ctx: &mut EventContext<'_>) {
        self.log.record(&self.name, Firing::Aborted, ctx.now());
    }
}
