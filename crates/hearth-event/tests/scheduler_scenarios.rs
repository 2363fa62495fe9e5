//! End-to-end scheduler scenarios using the shared fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hearth_core::VirtualTime;
use hearth_event::{Event, EventContext, EventScheduler, Outcome};
use hearth_test_utils::{EventLog, Firing, RecordingEvent, RepeatingEvent, StickyEvent};
use proptest::prelude::*;

#[test]
fn three_events_two_ticks() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    s.add_event(RecordingEvent::new("first100", &log), VirtualTime(100), true);
    s.add_event(RecordingEvent::new("second100", &log), VirtualTime(100), true);
    s.add_event(RecordingEvent::new("only50", &log), VirtualTime(50), true);

    s.tick(60);
    assert_eq!(log.executed(), vec!["only50"]);
    log.take();

    s.tick(40);
    assert_eq!(log.executed(), vec!["first100", "second100"]);
    assert!(s.is_empty());
    assert_eq!(s.now(), VirtualTime(100));
}

#[test]
fn repeating_event_fires_until_exhausted() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    s.add_event_in(RepeatingEvent::times("pulse", 100, 3, &log), 100);

    let mut fired_at = Vec::new();
    for _ in 0..6 {
        s.tick(100);
        fired_at.extend(log.take().into_iter().map(|e| e.at.as_millis()));
    }
    assert_eq!(fired_at, vec![100, 200, 300]);
    assert!(s.is_empty());
}

#[test]
fn done_deletable_never_fires_again() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    let id = s.add_event_in(RecordingEvent::new("once", &log), 10);
    for _ in 0..5 {
        s.tick(10);
    }
    assert_eq!(log.count("once", Firing::Executed), 1);
    assert!(!s.contains(id));
}

#[test]
fn soft_kill_all_aborts_each_event_once() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    s.add_event_in(RepeatingEvent::forever("aura", 50, &log), 50);
    s.add_event_in(RecordingEvent::new("cast", &log), 200);
    s.tick(50);

    s.kill_all(false);
    s.kill_all(false);
    for _ in 0..10 {
        s.tick(50);
    }
    assert_eq!(log.count("aura", Firing::Aborted), 1);
    assert_eq!(log.count("cast", Firing::Aborted), 1);
    assert_eq!(log.count("aura", Firing::Executed), 1);
    assert_eq!(log.count("cast", Firing::Executed), 0);
    assert!(s.is_empty());
}

#[test]
fn aborting_sticky_event_polled_until_released() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    let (ev, gate) = StickyEvent::new("channel", &log);
    let id = s.add_event_in(ev, 100);
    s.abort_event(id);

    let r = s.tick(100);
    assert_eq!(r.aborted, 1);
    assert!(s.contains(id));
    for _ in 0..4 {
        let r = s.tick(100);
        assert_eq!(r.aborted, 0);
        assert_eq!(r.executed, 0);
    }
    gate.release();
    let r = s.tick(100);
    assert_eq!(r.dropped, 1);
    assert!(!s.contains(id));
    assert_eq!(log.aborted(), vec!["channel"]);
    assert!(log.executed().is_empty());
}

#[test]
fn forced_kill_all_clears_sticky_events() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    let (ev, _gate) = StickyEvent::new("stuck", &log);
    s.add_event_in(ev, 10);
    s.tick(10);
    assert_eq!(s.pending_count(), 1, "finished but not deletable");

    s.kill_all(true);
    assert!(s.is_empty());
    assert!(log.aborted().is_empty(), "finished entries are not aborted");
}

/// Requests another kill-all from inside its abort handler.
struct Vengeful {
    aborts: Arc<AtomicUsize>,
}

impl Event for Vengeful {
    fn execute(&mut self, _ctx: &mut EventContext<'_>) -> Outcome {
        Outcome::Requeue { delay_ms: 10 }
    }

    fn on_abort(&mut self, ctx: &mut EventContext<'_>) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        ctx.request_kill_all(true);
    }
}

#[test]
fn reentrant_kill_all_terminates() {
    let aborts = Arc::new(AtomicUsize::new(0));
    let mut s = EventScheduler::new();
    for _ in 0..3 {
        s.add_event_in(
            Vengeful {
                aborts: Arc::clone(&aborts),
            },
            10,
        );
    }
    s.kill_all(false);
    assert_eq!(aborts.load(Ordering::SeqCst), 3);
    assert!(s.is_empty());
}

#[test]
fn kill_all_requested_from_execute_runs_after_batch() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();

    struct Wipe;
    impl Event for Wipe {
        fn execute(&mut self, ctx: &mut EventContext<'_>) -> Outcome {
            ctx.request_kill_all(false);
            Outcome::Done
        }
    }

    s.add_event_in(Wipe, 10);
    s.add_event_in(RecordingEvent::new("same_tick", &log), 10);
    s.add_event_in(RecordingEvent::new("later", &log), 500);
    let r = s.tick(10);

    assert_eq!(log.executed(), vec!["same_tick"]);
    assert_eq!(log.aborted(), vec!["later"]);
    assert_eq!(r.waiting, 0);
}

#[test]
fn abort_handle_cancels_from_other_thread() {
    let log = EventLog::new();
    let mut s = EventScheduler::new();
    let id = s.add_event_in(RepeatingEvent::forever("proximity", 25, &log), 25);
    s.tick(25);
    let handle = s.abort_handle(id).expect("pending");

    std::thread::scope(|scope| {
        scope.spawn(|| handle.abort());
    });

    s.tick(25);
    s.tick(25);
    assert_eq!(log.count("proximity", Firing::Executed), 1);
    assert_eq!(log.count("proximity", Firing::Aborted), 1);
    assert!(!s.contains(id));
}

proptest! {
    #[test]
    fn events_run_in_time_then_insertion_order(
        times in proptest::collection::vec(0u64..200, 1..64),
        step in 1u32..50,
    ) {
        let log = EventLog::new();
        let mut s = EventScheduler::new();
        for (i, &t) in times.iter().enumerate() {
            s.add_event(RecordingEvent::new(i.to_string(), &log), VirtualTime(t), true);
        }

        let mut expected: Vec<(u64, usize)> =
            times.iter().copied().enumerate().map(|(i, t)| (t, i)).collect();
        expected.sort();

        while !s.is_empty() {
            s.tick(step);
        }

        let executed: Vec<usize> = log
            .take()
            .into_iter()
            .map(|e| e.name.parse().unwrap())
            .collect();
        let expected: Vec<usize> = expected.into_iter().map(|(_, i)| i).collect();
        prop_assert_eq!(executed, expected);
    }
}
