//! The per-owner event scheduler.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use hearth_core::{EventId, VirtualTime};
use tracing::{debug, trace};

use crate::context::{Deferred, EventContext, Spawned};
use crate::event::{AbortHandle, Event, Outcome};

/// Pending-set key: scheduled time, then arrival order.
type Key = (VirtualTime, u64);

/// Lifecycle state of a pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryState {
    /// Executes when due.
    Active,
    /// Returned `Done` but was not yet deletable.
    Finishing,
    /// Received `on_abort` but was not yet deletable.
    Aborting,
}

struct Entry {
    id: EventId,
    event: Box<dyn Event>,
    abort: AbortHandle,
    state: EntryState,
    added_time: Option<VirtualTime>,
}

/// What happened during one [`EventScheduler::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Events whose `execute` ran.
    pub executed: usize,
    /// Executed events that asked to run again.
    pub requeued: usize,
    /// Events that received `on_abort` instead of running.
    pub aborted: usize,
    /// Entries removed from the pending set.
    pub dropped: usize,
    /// Entries still pending after the tick.
    pub waiting: usize,
}

/// A virtual clock plus the time-ordered set of events waiting on it.
///
/// Single-threaded: `tick` takes `&mut self`, so two ticks can never
/// overlap. The scheduler is `Send` and can be moved to the thread that
/// drives it. Abort requests can come from any thread through
/// [`AbortHandle`].
///
/// Dropping the scheduler performs [`kill_all(true)`](Self::kill_all).
pub struct EventScheduler {
    now: VirtualTime,
    pending: BTreeMap<Key, Entry>,
    index: HashMap<EventId, Key>,
    next_seq: u64,
    next_id: u64,
    aborting: bool,
}

const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<EventScheduler>();
};

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    /// Create a scheduler with its clock at zero.
    pub fn new() -> Self {
        Self {
            now: VirtualTime::ZERO,
            pending: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            next_id: 0,
            aborting: false,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Virtual time `delay_ms` from now.
    pub fn calculate_time(&self, delay_ms: u64) -> VirtualTime {
        self.now.after(delay_ms)
    }

    /// Schedule `event` at absolute virtual time `time`.
    ///
    /// A time at or before now runs on the next tick; nothing runs
    /// immediately. With `set_added_time` the entry is stamped with the
    /// current virtual time, readable through
    /// [`EventContext::added_time`].
    pub fn add_event<E: Event + 'static>(
        &mut self,
        event: E,
        time: VirtualTime,
        set_added_time: bool,
    ) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.insert(
            time,
            Entry {
                id,
                event: Box::new(event),
                abort: AbortHandle::new(),
                state: EntryState::Active,
                added_time: set_added_time.then_some(self.now),
            },
        );
        id
    }

    /// Schedule `event` to run `delay_ms` from now.
    pub fn add_event_in<E: Event + 'static>(&mut self, event: E, delay_ms: u64) -> EventId {
        let time = self.calculate_time(delay_ms);
        self.add_event(event, time, true)
    }

    /// Advance the clock by `delta_ms` and run everything now due.
    ///
    /// Entries are processed in `(scheduled_time, arrival)` order. Events
    /// re-queued or added during the tick run on a later tick even when
    /// their new time has already passed.
    pub fn tick(&mut self, delta_ms: u32) -> TickReport {
        self.now += u64::from(delta_ms);
        let due = self.take_due();
        let mut report = TickReport::default();
        let mut deferred = Deferred::default();

        for (key, mut entry) in due {
            match entry.state {
                EntryState::Active if entry.abort.is_abort_requested() => {
                    let mut ctx = EventContext {
                        now: self.now,
                        tick_delta: delta_ms,
                        event_id: entry.id,
                        added_time: entry.added_time,
                        abort: &entry.abort,
                        next_id: &mut self.next_id,
                        deferred: &mut deferred,
                    };
                    entry.event.on_abort(&mut ctx);
                    entry.state = EntryState::Aborting;
                    report.aborted += 1;
                    self.settle(key, entry, &mut report);
                }
                EntryState::Active => {
                    let mut ctx = EventContext {
                        now: self.now,
                        tick_delta: delta_ms,
                        event_id: entry.id,
                        added_time: entry.added_time,
                        abort: &entry.abort,
                        next_id: &mut self.next_id,
                        deferred: &mut deferred,
                    };
                    let outcome = entry.event.execute(&mut ctx);
                    report.executed += 1;
                    match outcome {
                        Outcome::Done => {
                            entry.state = EntryState::Finishing;
                            self.settle(key, entry, &mut report);
                        }
                        Outcome::Requeue { delay_ms } => {
                            report.requeued += 1;
                            let time = self.now.after(delay_ms);
                            self.insert(time, entry);
                        }
                        Outcome::RequeueAt { time } => {
                            report.requeued += 1;
                            self.insert(time, entry);
                        }
                    }
                }
                EntryState::Finishing | EntryState::Aborting => {
                    self.settle(key, entry, &mut report);
                }
            }
        }

        for spawned in deferred.spawned {
            self.insert_spawned(spawned);
        }
        if let Some(force) = deferred.kill_all {
            self.kill_all(force);
        }

        report.waiting = self.pending.len();
        trace!(
            now = self.now.as_millis(),
            delta_ms,
            executed = report.executed,
            requeued = report.requeued,
            aborted = report.aborted,
            waiting = report.waiting,
            "scheduler tick"
        );
        report
    }

    /// Abort every pending event.
    ///
    /// Every entry's abort flag is set and each `Active` entry receives
    /// `on_abort` exactly once. Deletable entries are dropped. With
    /// `force`, all entries are dropped regardless and the pending set
    /// is left empty.
    ///
    /// Re-entrant calls (a handler requesting another kill-all while this
    /// one runs) are ignored. Events added by `on_abort` handlers survive
    /// a non-forced kill and are discarded by a forced one.
    pub fn kill_all(&mut self, force: bool) {
        if self.aborting {
            debug!(force, "kill_all already in progress, nested request ignored");
            return;
        }
        self.aborting = true;

        let entries = std::mem::take(&mut self.pending);
        let total = entries.len();
        let mut aborted = 0usize;
        let mut deferred = Deferred::default();

        for (key, mut entry) in entries {
            entry.abort.abort();
            if entry.state == EntryState::Active {
                let mut ctx = EventContext {
                    now: self.now,
                    tick_delta: 0,
                    event_id: entry.id,
                    added_time: entry.added_time,
                    abort: &entry.abort,
                    next_id: &mut self.next_id,
                    deferred: &mut deferred,
                };
                entry.event.on_abort(&mut ctx);
                entry.state = EntryState::Aborting;
                aborted += 1;
            }
            if force || entry.event.is_deletable() {
                self.index.remove(&entry.id);
            } else {
                self.pending.insert(key, entry);
            }
        }

        let spawned = deferred.spawned.len();
        if force {
            if spawned > 0 {
                debug!(spawned, "discarding events added during forced kill_all");
            }
        } else {
            for s in deferred.spawned {
                self.insert_spawned(s);
            }
        }
        if let Some(nested) = deferred.kill_all {
            self.kill_all(nested);
        }

        self.aborting = false;
        debug!(
            force,
            total,
            aborted,
            remaining = self.pending.len(),
            "kill_all complete"
        );
    }

    /// Request abort of a pending event. Returns `false` if `id` is not
    /// pending.
    pub fn abort_event(&self, id: EventId) -> bool {
        match self.entry(id) {
            Some(entry) => {
                entry.abort.abort();
                true
            }
            None => false,
        }
    }

    /// A shareable abort handle for a pending event.
    pub fn abort_handle(&self, id: EventId) -> Option<AbortHandle> {
        self.entry(id).map(|e| e.abort.clone())
    }

    /// Whether `id` is still pending (in any lifecycle state).
    pub fn contains(&self, id: EventId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of pending entries, including ones waiting to become
    /// deletable.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Scheduled time of the earliest pending entry.
    pub fn next_due(&self) -> Option<VirtualTime> {
        self.pending.keys().next().map(|&(time, _)| time)
    }

    // ── Internals ───────────────────────────────────────────────

    fn entry(&self, id: EventId) -> Option<&Entry> {
        let key = self.index.get(&id)?;
        self.pending.get(key)
    }

    /// Insert with a fresh arrival number.
    fn insert(&mut self, time: VirtualTime, entry: Entry) {
        let key = (time, self.next_seq);
        self.next_seq += 1;
        self.index.insert(entry.id, key);
        self.pending.insert(key, entry);
    }

    fn insert_spawned(&mut self, s: Spawned) {
        self.insert(
            s.time,
            Entry {
                id: s.id,
                event: s.event,
                abort: AbortHandle::new(),
                state: EntryState::Active,
                added_time: Some(s.added_time),
            },
        );
    }

    /// Drop a finished or aborted entry if it allows it, otherwise put it
    /// back under its existing key.
    fn settle(&mut self, key: Key, entry: Entry, report: &mut TickReport) {
        if entry.event.is_deletable() {
            self.index.remove(&entry.id);
            report.dropped += 1;
        } else {
            self.pending.insert(key, entry);
        }
    }

    /// Split off every entry with `scheduled_time <= now`.
    fn take_due(&mut self) -> BTreeMap<Key, Entry> {
        match self.now.as_millis().checked_add(1) {
            Some(bound) => {
                let later = self.pending.split_off(&(VirtualTime(bound), 0));
                std::mem::replace(&mut self.pending, later)
            }
            None => std::mem::take(&mut self.pending),
        }
    }
}

impl Drop for EventScheduler {
    fn drop(&mut self) {
        self.kill_all(true);
    }
}

impl fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventScheduler")
            .field("now", &self.now)
            .field("pending", &self.pending.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}
