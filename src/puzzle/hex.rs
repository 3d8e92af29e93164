//! Hex-offset cell addressing and neighbor topology.
//!
//! The board is a brick-offset grid: every other row is shifted right by half
//! a tile (a "long" row) and holds one cell fewer than its neighbors. Because
//! of the shift, the diagonal neighbors of a cell depend on whether its own
//! row is long, so adjacency is expressed as two offset tables.
//!
//! Offsets are `(column delta, row delta)` pairs. Rows grow downward, so a
//! negative row delta points at the row above.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// A `(row, column)` slot on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowCol {
    pub row: usize,
    pub column: usize,
}

impl RowCol {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Apply a `(column, row)` offset, returning `None` when it leaves the
    /// non-negative quadrant.
    pub fn offset(self, (d_column, d_row): (i32, i32)) -> Option<Self> {
        let row = self.row.checked_add_signed(d_row as isize)?;
        let column = self.column.checked_add_signed(d_column as isize)?;
        Some(Self { row, column })
    }
}

impl std::fmt::Display for RowCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Neighbor offsets for short (unshifted) rows.
pub const SHORT_ROW_OFFSETS: [(i32, i32); 6] = [
    (1, 0),   // East
    (0, 1),   // Southeast
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // Northeast
];

/// Neighbor offsets for long (half-tile shifted) rows.
pub const LONG_ROW_OFFSETS: [(i32, i32); 6] = [
    (1, 0),  // East
    (1, 1),  // Southeast
    (0, 1),  // Southwest
    (-1, 0), // West
    (0, -1), // Northwest
    (1, -1), // Northeast
];

/// Pick the offset table for a row.
pub const fn offsets_for(long_row: bool) -> &'static [(i32, i32); 6] {
    if long_row {
        &LONG_ROW_OFFSETS
    } else {
        &SHORT_ROW_OFFSETS
    }
}

/// Directional restriction applied to a neighbor query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeighborFilter {
    /// All six directions.
    #[default]
    Normal,
    /// Only the row above.
    Upper,
    /// Only the row below.
    Lower,
    /// Only offsets that keep the column index.
    Sibling,
}

impl NeighborFilter {
    pub fn accepts(self, (d_column, d_row): (i32, i32)) -> bool {
        match self {
            NeighborFilter::Normal => true,
            NeighborFilter::Upper => d_row < 0,
            NeighborFilter::Lower => d_row > 0,
            NeighborFilter::Sibling => d_column == 0,
        }
    }
}

/// Which edges of a touched cell a projectile pressed against.
///
/// Mirrors the per-axis contact flags an arcade physics body reports for the
/// bubble that was hit. `up` means the projectile arrived on the touched
/// bubble's upper side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Touching {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Touching {
    /// Derive contact edges from the two centers. Axis deltas smaller than
    /// `dead_zone` do not count as touching on that axis.
    pub fn between(touched: Vec2, projectile: Vec2, dead_zone: f32) -> Self {
        let delta = projectile - touched;
        Self {
            up: delta.y < -dead_zone,
            down: delta.y > dead_zone,
            left: delta.x < -dead_zone,
            right: delta.x > dead_zone,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Whether an offset points toward one of the touched edges.
    pub fn admits(&self, (d_column, d_row): (i32, i32)) -> bool {
        (self.up && d_row < 0)
            || (self.down && d_row > 0)
            || (self.left && d_column < 0)
            || (self.right && d_column > 0)
    }
}
