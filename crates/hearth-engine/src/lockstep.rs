//! Lockstep (caller-driven) driver.
//!
//! [`LockstepDriver`] owns its target and ticks it only when told to, with
//! deltas the caller chooses. No threads are involved, so runs are fully
//! deterministic.

use crate::target::TickTarget;

/// Drives a [`TickTarget`] with explicit deltas.
#[derive(Debug)]
pub struct LockstepDriver<T> {
    target: T,
    elapsed_ms: u64,
    steps: u64,
}

impl<T: TickTarget> LockstepDriver<T> {
    /// Take ownership of `target`.
    pub fn new(target: T) -> Self {
        Self {
            target,
            elapsed_ms: 0,
            steps: 0,
        }
    }

    /// Tick the target once.
    pub fn step(&mut self, delta_ms: u32) {
        self.target.tick(delta_ms);
        self.elapsed_ms += u64::from(delta_ms);
        self.steps += 1;
    }

    /// Tick the target `steps` times with the same delta.
    pub fn run(&mut self, steps: u64, delta_ms: u32) {
        for _ in 0..steps {
            self.step(delta_ms);
        }
    }

    /// Total virtual milliseconds delivered so far.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Number of ticks delivered so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Borrow the target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Borrow the target mutably, e.g. to add events between steps.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Give the target back.
    pub fn into_target(self) -> T {
        self.target
    }
}
