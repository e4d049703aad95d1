//! Spatial partitioning for the collision broad phase.
//!
//! The brute-force collision pass visits every unordered pair. The grid
//! narrows that to pairs in neighbouring cells, then hands the candidates back
//! sorted so they are resolved in exactly the order the brute-force pass would
//! use. With a cell size at least as large as the biggest possible contact
//! distance the two passes produce identical results.

use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Grid-based spatial partitioning structure.
///
/// Entries are slot indices into a caller-owned collider list, rebuilt every
/// tick before the collision pass.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    /// Cell size in world units.
    pub cell_size: f32,
    /// Map from cell coordinates to the slots in that cell.
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Clear all entries (call before rebuilding each tick).
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Insert a slot at a position.
    pub fn insert(&mut self, index: usize, x: f32, y: f32) {
        let cell = self.world_to_cell(x, y);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Every unordered pair `(i, j)` with `i < j` whose cells are adjacent,
    /// sorted lexicographically.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (&(cx, cy), entries) in &self.cells {
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(others) = self.cells.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    for &a in entries {
                        for &b in others {
                            if a < b {
                                pairs.push((a, b));
                            }
                        }
                    }
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}
