//! The context handed to events while they run.

use hearth_core::{EventId, VirtualTime};
use smallvec::SmallVec;

use crate::event::{AbortHandle, Event};

/// An event added from inside a handler, inserted after the current
/// batch.
pub(crate) struct Spawned {
    pub(crate) id: EventId,
    pub(crate) event: Box<dyn Event>,
    pub(crate) time: VirtualTime,
    pub(crate) added_time: VirtualTime,
}

/// Side effects requested by handlers, applied once the batch that
/// produced them has finished.
#[derive(Default)]
pub(crate) struct Deferred {
    pub(crate) spawned: SmallVec<[Spawned; 4]>,
    pub(crate) kill_all: Option<bool>,
}

/// Execution context for [`Event::execute`] and [`Event::on_abort`].
///
/// Everything an event adds or requests through the context takes effect
/// after the scheduler finishes its current batch, so a handler never
/// observes its own side effects within the same tick.
pub struct EventContext<'a> {
    pub(crate) now: VirtualTime,
    pub(crate) tick_delta: u32,
    pub(crate) event_id: EventId,
    pub(crate) added_time: Option<VirtualTime>,
    pub(crate) abort: &'a AbortHandle,
    pub(crate) next_id: &'a mut u64,
    pub(crate) deferred: &'a mut Deferred,
}

impl EventContext<'_> {
    /// Current virtual time of the owning scheduler.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Milliseconds the clock advanced in the current tick. Zero during
    /// `kill_all`.
    pub fn tick_delta(&self) -> u32 {
        self.tick_delta
    }

    /// Identifier of the running event.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Virtual time at which the running event was added, if stamped.
    pub fn added_time(&self) -> Option<VirtualTime> {
        self.added_time
    }

    /// The running event's own abort handle.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Schedule a new event at an absolute virtual time. It is inserted
    /// after the current batch and never runs before the next tick.
    pub fn add_event<E: Event + 'static>(&mut self, event: E, time: VirtualTime) -> EventId {
        let id = EventId(*self.next_id);
        *self.next_id += 1;
        self.deferred.spawned.push(Spawned {
            id,
            event: Box::new(event),
            time,
            added_time: self.now,
        });
        id
    }

    /// Schedule a new event `delay_ms` after the current virtual time.
    pub fn add_event_in<E: Event + 'static>(&mut self, event: E, delay_ms: u64) -> EventId {
        let time = self.now.after(delay_ms);
        self.add_event(event, time)
    }

    /// Ask the scheduler to abort every pending event once the current
    /// batch is done. Ignored while a kill-all is already running.
    pub fn request_kill_all(&mut self, force: bool) {
        let merged = self.deferred.kill_all.unwrap_or(false) || force;
        self.deferred.kill_all = Some(merged);
    }
}
