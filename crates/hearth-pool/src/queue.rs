//! A blocking FIFO that can be frozen to release every waiter.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct State<T> {
    items: VecDeque<T>,
    frozen: bool,
}

/// Blocking deque shared between producers and worker threads.
///
/// [`pop`](Self::pop) sleeps until an item arrives or the queue is
/// frozen. [`freeze`](Self::freeze) rejects all further pushes, wakes
/// every sleeper, and hands back whatever was still queued.
pub struct FreezableQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> Default for FreezableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FreezableQueue<T> {
    /// Create an empty, unfrozen queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                frozen: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append to the back. Returns the item if the queue is frozen.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.frozen {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Insert at the front, ahead of everything queued. Returns the item
    /// if the queue is frozen.
    pub fn push_front(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.frozen {
            return Err(item);
        }
        state.items.push_front(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Take the front item, blocking until one is available.
    ///
    /// Returns `None` once the queue is frozen and empty: the consumer
    /// should exit.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.frozen {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Take the front item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Freeze the queue: reject further pushes, wake all waiters, and
    /// return the items that were still queued, front first.
    pub fn freeze(&self) -> Vec<T> {
        let mut state = self.lock();
        state.frozen = true;
        let discarded: Vec<T> = state.items.drain(..).collect();
        drop(state);
        self.available.notify_all();
        discarded
    }

    /// Accept pushes again after a [`freeze`](Self::freeze).
    pub fn thaw(&self) {
        self.lock().frozen = false;
    }

    /// Whether the queue is frozen.
    pub fn is_frozen(&self) -> bool {
        self.lock().frozen
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for FreezableQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("FreezableQueue")
            .field("len", &state.items.len())
            .field("frozen", &state.frozen)
            .finish()
    }
}
