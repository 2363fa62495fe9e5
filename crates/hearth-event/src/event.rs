//! The [`Event`] trait and its supporting types.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hearth_core::VirtualTime;

use crate::context::EventContext;

/// What a scheduler should do with an event after executing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The event is finished. It is dropped once
    /// [`is_deletable`](Event::is_deletable) reports `true`.
    Done,
    /// Run again `delay_ms` after the current virtual time.
    Requeue {
        /// Delay relative to the tick's virtual time.
        delay_ms: u64,
    },
    /// Run again at an absolute virtual time.
    RequeueAt {
        /// Absolute re-insertion time. A time at or before now runs on
        /// the next tick.
        time: VirtualTime,
    },
}

/// A timed behaviour owned by an [`EventScheduler`](crate::EventScheduler).
///
/// The scheduler calls [`execute`](Event::execute) when the event comes
/// due, or [`on_abort`](Event::on_abort) instead if an abort was
/// requested first. A single firing is executed or aborted, never both.
///
/// Events that hold resources another subsystem still references can
/// return `false` from [`is_deletable`](Event::is_deletable); the
/// scheduler keeps them, polling once per tick, until they release.
pub trait Event: Send {
    /// Run the event. `ctx` gives the current virtual time and lets the
    /// event schedule follow-up events.
    fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome;

    /// Whether the scheduler may drop this event now.
    fn is_deletable(&self) -> bool {
        true
    }

    /// Called once when an abort is delivered instead of execution.
    fn on_abort(&mut self, _ctx: &mut EventContext<'_>) {}
}

impl<E: Event + ?Sized> Event for Box<E> {
    fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome {
        (**self).execute(ctx)
    }

    fn is_deletable(&self) -> bool {
        (**self).is_deletable()
    }

    fn on_abort(&mut self, ctx: &mut EventContext<'_>) {
        (**self).on_abort(ctx);
    }
}

/// An [`Event`] built from a closure, for behaviours with no abort hook
/// and no deletion gate.
///
/// ```
/// use hearth_event::{EventScheduler, FnEvent, Outcome};
///
/// let mut sched = EventScheduler::new();
/// sched.add_event_in(FnEvent::new(|_ctx| Outcome::Requeue { delay_ms: 500 }), 500);
/// let report = sched.tick(500);
/// assert_eq!(report.requeued, 1);
/// ```
pub struct FnEvent<F>(F);

impl<F> FnEvent<F>
where
    F: FnMut(&mut EventContext<'_>) -> Outcome + Send,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Event for FnEvent<F>
where
    F: FnMut(&mut EventContext<'_>) -> Outcome + Send,
{
    fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome {
        (self.0)(ctx)
    }
}

/// Shared abort flag for one pending event.
///
/// Cloneable and usable from any thread. Setting the flag takes effect
/// at the event's next due tick (or the next `kill_all`), when
/// `on_abort` is delivered in place of `execute`.
#[derive(Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Request that the event be aborted.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether an abort has been requested.
    pub fn is_abort_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle")
            .field("abort_requested", &self.is_abort_requested())
            .finish()
    }
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<AbortHandle>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let a = AbortHandle::new();
        let b = a.clone();
        assert!(!b.is_abort_requested());
        a.abort();
        assert!(b.is_abort_requested());
        assert_eq!(format!("{b:?}"), "AbortHandle { abort_requested: true }");
    }

    #[test]
    fn abort_from_another_thread() {
        let handle = AbortHandle::new();
        let remote = handle.clone();
        std::thread::spawn(move || remote.abort()).join().unwrap();
        assert!(handle.is_abort_requested());
    }
}
