//! Things a driver can tick.

use hearth_event::EventScheduler;

/// Something that advances by a number of virtual milliseconds per
/// heartbeat.
pub trait TickTarget: Send + 'static {
    /// Advance by `delta_ms` and run whatever came due.
    fn tick(&mut self, delta_ms: u32);
}

impl TickTarget for EventScheduler {
    fn tick(&mut self, delta_ms: u32) {
        EventScheduler::tick(self, delta_ms);
    }
}

/// Ticks every element in order, e.g. one scheduler per owner shard.
impl<T: TickTarget> TickTarget for Vec<T> {
    fn tick(&mut self, delta_ms: u32) {
        for target in self.iter_mut() {
            target.tick(delta_ms);
        }
    }
}

/// A [`TickTarget`] backed by a closure.
pub struct TickFn<F>(pub F);

impl<F> TickFn<F>
where
    F: FnMut(u32) + Send + 'static,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> TickTarget for TickFn<F>
where
    F: FnMut(u32) + Send + 'static,
{
    fn tick(&mut self, delta_ms: u32) {
        (self.0)(delta_ms);
    }
}
