//! Wall-clock to virtual-millisecond conversion.

use std::time::Instant;

/// Converts wall-clock instants into whole-millisecond tick deltas.
///
/// Sub-millisecond remainders carry into the next delta, so over many
/// heartbeats the deltas sum to the elapsed wall time. A delta larger
/// than `max_delta_ms` is clamped and its excess (and carry) dropped.
#[derive(Debug)]
pub(crate) struct DeltaClock {
    last: Instant,
    carry_us: u64,
    max_delta_ms: u32,
}

impl DeltaClock {
    pub(crate) fn new(start: Instant, max_delta_ms: u32) -> Self {
        Self {
            last: start,
            carry_us: 0,
            max_delta_ms,
        }
    }

    /// Delta in milliseconds from the previous call (or construction)
    /// to `now`, and whether it was clamped.
    pub(crate) fn advance(&mut self, now: Instant) -> (u32, bool) {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        let total_us = u64::try_from(elapsed.as_micros())
            .unwrap_or(u64::MAX)
            .saturating_add(self.carry_us);
        let whole_ms = total_us / 1_000;
        if whole_ms > u64::from(self.max_delta_ms) {
            self.carry_us = 0;
            return (self.max_delta_ms, true);
        }
        self.carry_us = total_us % 1_000;
        // whole_ms <= max_delta_ms, so it fits.
        (whole_ms as u32, false)
    }
}
