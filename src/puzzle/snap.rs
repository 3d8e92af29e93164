//! Snap target selection.
//!
//! When a projectile reports contact, it attaches to the empty cell next to
//! the bubble it touched, on the side it touched. Without a usable neighbor
//! it falls back to the cell under its own position.

use bevy::math::Vec2;

use super::{
    bubble::BubbleId,
    grid::PuzzleGrid,
    hex::{RowCol, Touching},
};

/// The grid bubble a projectile physically touched, and on which edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub neighbor: BubbleId,
    pub touching: Touching,
}

/// Single-flight guard of the snap engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapState {
    #[default]
    Idle,
    /// A snap was committed and its deferred work has not finished yet.
    Resolving { bubble: BubbleId },
}

impl SnapState {
    pub fn is_resolving(&self) -> bool {
        matches!(self, SnapState::Resolving { .. })
    }
}

/// A contact that arrived while another snap was resolving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingContact {
    pub bubble: BubbleId,
    pub position: Vec2,
    pub contact: Option<Contact>,
}

/// Pick the cell a projectile at `position` attaches to.
pub fn resolve_target(grid: &PuzzleGrid, position: Vec2, contact: Option<&Contact>) -> RowCol {
    contact
        .and_then(|contact| nearest_open_cell(grid, position, contact))
        .unwrap_or_else(|| grid.row_col_of(position))
}

/// Nearest empty in-bounds cell around the touched bubble, restricted to the
/// touched edges. Ties go to the first candidate in offset-table order.
pub fn nearest_open_cell(grid: &PuzzleGrid, position: Vec2, contact: &Contact) -> Option<RowCol> {
    let cell = grid.bubble(contact.neighbor)?.cell()?;

    let mut best: Option<(f32, RowCol)> = None;
    for (offset, candidate) in grid.neighbor_cells(cell) {
        if !contact.touching.admits(offset) || grid.is_occupied(candidate) {
            continue;
        }
        let distance = grid.coordinate_of(candidate).distance(position);
        if best.is_none_or(|(min, _)| distance < min) {
            best = Some((distance, candidate));
        }
    }

    best.map(|(_, cell)| cell)
}
