//! Virtual clock timestamps.
//!
//! The virtual clock counts simulated milliseconds. It is distinct from
//! wall-clock time and only advances when a scheduler is ticked.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// An absolute virtual-clock timestamp in milliseconds.
///
/// Arithmetic saturates: the clock never wraps (u64 milliseconds would
/// take ~584 million years to overflow, but saturation keeps
/// pathological `RequeueAt { time: u64::MAX }` requests well-defined).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualTime(pub u64);

impl VirtualTime {
    /// The origin of every virtual clock.
    pub const ZERO: Self = Self(0);

    /// Milliseconds since the clock origin.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// This timestamp advanced by `delay_ms`, saturating at `u64::MAX`.
    pub const fn after(self, delay_ms: u64) -> Self {
        Self(self.0.saturating_add(delay_ms))
    }

    /// Milliseconds elapsed from `earlier` to `self`, or zero if
    /// `earlier` is in the future.
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<u64> for VirtualTime {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl Add<u64> for VirtualTime {
    type Output = Self;

    fn add(self, rhs: u64) -> Self {
        self.after(rhs)
    }
}

impl AddAssign<u64> for VirtualTime {
    fn add_assign(&mut self, rhs: u64) {
        *self = self.after(rhs);
    }
}

impl Sub for VirtualTime {
    type Output = u64;

    fn sub(self, rhs: Self) -> u64 {
        self.since(rhs)
    }
}
