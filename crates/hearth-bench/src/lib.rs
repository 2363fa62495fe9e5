//! Benchmark profiles for the Hearth world-server core.
//!
//! Provides pre-populated workloads shared by the criterion benches:
//!
//! - [`populated_scheduler`]: a scheduler with repeating events spread
//!   over a time window, like a busy map region's creature timers
//! - [`populated_grid`]: entities scattered over a square of grid cells
//! - [`random_cells`]: a deterministic walk of cell coordinates

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use hearth_core::CellId;
use hearth_event::{EventScheduler, FnEvent, Outcome};
use hearth_link::{CellGrid, GridRef};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Build a scheduler holding `events` repeating events whose first
/// firing is spread uniformly over `[0, spread_ms)`.
///
/// Each event re-queues itself every `spread_ms`, so the pending set
/// stays at `events` entries no matter how long the benchmark runs.
pub fn populated_scheduler(events: usize, spread_ms: u64, seed: u64) -> EventScheduler {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let period = spread_ms.max(1);
    let mut sched = EventScheduler::new();
    for _ in 0..events {
        let delay = rng.next_u64() % period;
        sched.add_event_in(
            FnEvent::new(move |_| Outcome::Requeue { delay_ms: period }),
            delay,
        );
    }
    sched
}

/// Build a grid of `side x side` cells with `entities` entities placed
/// uniformly at random.
pub fn populated_grid(entities: usize, side: u32, seed: u64) -> (CellGrid<u64>, Vec<GridRef>) {
    let mut grid = CellGrid::new();
    let cells = random_cells(entities, side, seed);
    let handles = cells
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let h = grid.spawn(i as u64);
            // Freshly spawned handles are never stale.
            let _ = grid.enter(h, cell);
            h
        })
        .collect();
    (grid, handles)
}

/// `count` deterministic cell coordinates inside a `side x side` square.
pub fn random_cells(count: usize, side: u32, seed: u64) -> Vec<CellId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let side = side.max(1);
    (0..count)
        .map(|_| CellId::new(rng.next_u32() % side, rng.next_u32() % side))
        .collect()
}
