//! Strongly-typed identifiers.

use std::fmt;

/// Identifies an event queued in an
/// `EventScheduler`.
///
/// Assigned from a per-scheduler monotonic counter at insertion, so two
/// events in the same scheduler never share an ID. IDs are not reused
/// when an event re-queues itself: the ID follows the event for its
/// whole lifetime inside the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Coordinates of a spatial grid cell.
///
/// Cell coordinates are computed by the caller from world positions;
/// the grid itself only does membership bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
}

impl CellId {
    /// Construct a cell ID from its column and row.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for CellId {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}
