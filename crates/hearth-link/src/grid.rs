//! Spatial grid bookkeeping on top of [`LinkArena`].
//!
//! Each loaded cell is a container keyed by [`CellId`]; each entity
//! holds one [`GridRef`] that is linked into the cell it currently
//! occupies. Cell geometry (which cell a world position maps to) is the
//! caller's business; the grid only tracks membership.

use hearth_core::{CellId, LinkError};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::arena::{LinkArena, Members};
use crate::key::{ContainerKey, RefKey};

/// An entity's membership handle in a [`CellGrid`].
pub type GridRef = RefKey;

/// Cells loaded on demand, each tracking the entities inside it.
///
/// Moving an entity between cells is a single [`enter`](Self::enter):
/// the entity is unlinked from its old cell and linked into the new one.
#[derive(Debug)]
pub struct CellGrid<E> {
    arena: LinkArena<CellId, E>,
    cells: IndexMap<CellId, ContainerKey>,
}

impl<E> Default for CellGrid<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> CellGrid<E> {
    /// Create a grid with no loaded cells.
    pub fn new() -> Self {
        Self {
            arena: LinkArena::new(),
            cells: IndexMap::new(),
        }
    }

    /// Register an entity. It occupies no cell until [`enter`](Self::enter).
    pub fn spawn(&mut self, entity: E) -> GridRef {
        self.arena.create_ref(entity)
    }

    /// Place the entity in `cell`, loading the cell if needed.
    ///
    /// An entity already in another cell is moved.
    pub fn enter(&mut self, grid_ref: GridRef, cell: CellId) -> Result<(), LinkError> {
        if !self.arena.contains_ref(grid_ref) {
            return Err(grid_ref.stale());
        }
        let key = self.load_cell(cell);
        self.arena.link(grid_ref, key)
    }

    /// Take the entity out of its cell. Returns whether it was in one.
    pub fn leave(&mut self, grid_ref: GridRef) -> Result<bool, LinkError> {
        self.arena.unlink(grid_ref)
    }

    /// Remove the entity from the grid entirely, returning it.
    ///
    /// Returns `None` for a stale handle.
    pub fn despawn(&mut self, grid_ref: GridRef) -> Option<E> {
        self.arena.destroy_ref(grid_ref).ok()
    }

    /// The cell the entity occupies, if any.
    pub fn cell_of(&self, grid_ref: GridRef) -> Option<CellId> {
        let key = self.arena.container_of(grid_ref).ok().flatten()?;
        self.arena.container(key).ok().copied()
    }

    /// Number of entities in `cell`. Zero for a cell that is not loaded.
    pub fn occupancy(&self, cell: CellId) -> usize {
        self.cells
            .get(&cell)
            .and_then(|&key| self.arena.size(key).ok())
            .unwrap_or(0)
    }

    /// Iterate the entities in `cell`, most recent arrival first.
    ///
    /// Returns `None` if the cell is not loaded.
    pub fn occupants(&self, cell: CellId) -> Option<Members<'_, CellId, E>> {
        let &key = self.cells.get(&cell)?;
        self.arena.members(key).ok()
    }

    /// Total occupancy over the inclusive rectangle `min..=max`.
    ///
    /// Only loaded cells are visited, so a sparse grid costs at most one
    /// lookup per cell in the rectangle.
    pub fn area_occupancy(&self, min: CellId, max: CellId) -> usize {
        let mut total = 0;
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                total += self.occupancy(CellId::new(x, y));
            }
        }
        total
    }

    /// Unload `cell`, evicting every occupant.
    ///
    /// Evicted entities stay registered with invalid handles until they
    /// [`enter`](Self::enter) another cell or are despawned. Returns how
    /// many were evicted; zero if the cell was not loaded.
    pub fn unload_cell(&mut self, cell: CellId) -> usize {
        let Some(key) = self.cells.shift_remove(&cell) else {
            return 0;
        };
        let evicted = self.arena.size(key).unwrap_or(0);
        // The key came from `cells`, which only holds live containers.
        let _ = self.arena.remove_container(key);
        debug!(%cell, evicted, "unloaded grid cell");
        evicted
    }

    /// Unload every loaded cell with no occupants. Returns how many
    /// cells were unloaded.
    pub fn unload_empty_cells(&mut self) -> usize {
        let empty: SmallVec<[CellId; 16]> = self
            .cells
            .iter()
            .filter(|(_, &key)| self.arena.size(key).is_ok_and(|n| n == 0))
            .map(|(&cell, _)| cell)
            .collect();
        for &cell in &empty {
            self.unload_cell(cell);
        }
        empty.len()
    }

    /// Iterate loaded cells in load order.
    pub fn loaded_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.keys().copied()
    }

    /// Number of loaded cells.
    pub fn loaded_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether the handle is currently placed in a cell.
    pub fn is_placed(&self, grid_ref: GridRef) -> bool {
        self.arena.is_valid(grid_ref)
    }

    /// The entity behind a handle.
    pub fn entity(&self, grid_ref: GridRef) -> Option<&E> {
        self.arena.member(grid_ref).ok()
    }

    /// The entity behind a handle, mutably.
    pub fn entity_mut(&mut self, grid_ref: GridRef) -> Option<&mut E> {
        self.arena.member_mut(grid_ref).ok()
    }

    /// Number of registered entities, placed or not.
    pub fn entity_count(&self) -> usize {
        self.arena.ref_count()
    }

    fn load_cell(&mut self, cell: CellId) -> ContainerKey {
        if let Some(&key) = self.cells.get(&cell) {
            return key;
        }
        let key = self.arena.insert_container(cell);
        self.cells.insert(cell, key);
        debug!(%cell, "loaded grid cell");
        key
    }
}
