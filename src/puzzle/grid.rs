//! The hex-offset grid that holds all snapped bubbles.
//!
//! Storage is a row-major matrix of optional bubble ids plus a map owning the
//! bubbles themselves. Each stored row keeps exactly `columns_for_row(row)`
//! slots, and the parity of that length (against the parity of the column
//! count) is what decides whether the row is long, i.e. shifted right by half
//! a tile.

use bevy::math::Vec2;
use std::collections::HashMap;

use super::{
    bubble::{Bubble, BubbleColor, BubbleId},
    error::PuzzleError,
    hex::{NeighborFilter, RowCol, offsets_for},
};

/// Board dimensions and tile geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub rows: usize,
    pub columns: usize,
    pub tile_width: f32,
    pub tile_height: f32,
    /// World position of the grid's top-left corner.
    pub origin: Vec2,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rows: 11,
            columns: 8,
            tile_width: 90.0,
            tile_height: 90.0,
            origin: Vec2::ZERO,
        }
    }
}

impl GridLayout {
    /// `1` when the configured column count is odd.
    pub fn column_parity(&self) -> usize {
        self.columns % 2
    }

    /// Width of the play area in world units.
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.tile_width
    }

    /// Slot count of a row, given whether it is long.
    fn columns_when(&self, long_row: bool) -> usize {
        if long_row {
            self.columns.saturating_sub(1)
        } else {
            self.columns
        }
    }
}

/// The grid resource holding every snapped bubble.
#[derive(Debug, Clone, Default)]
pub struct PuzzleGrid {
    layout: GridLayout,
    cells: Vec<Vec<Option<BubbleId>>>,
    bubbles: HashMap<BubbleId, Bubble>,
}

impl PuzzleGrid {
    /// Create an empty grid whose rows alternate short, long, short, ...
    pub fn new(layout: GridLayout) -> Self {
        Self::with_row_lengths(layout, std::iter::empty())
    }

    /// Create an empty grid whose leading rows take their long/short parity
    /// from the given declared lengths. Remaining rows continue alternating.
    pub fn with_row_lengths(layout: GridLayout, lengths: impl IntoIterator<Item = usize>) -> Self {
        let layout = GridLayout {
            rows: layout.rows.max(1),
            columns: layout.columns.max(1),
            ..layout
        };
        let column_parity = layout.column_parity();

        let mut cells: Vec<Vec<Option<BubbleId>>> = Vec::with_capacity(layout.rows);
        let mut lengths = lengths.into_iter();
        let mut previous_long = true;
        for _ in 0..layout.rows {
            let long_row = match lengths.next() {
                Some(length) => (length % 2) != column_parity,
                None => !previous_long,
            };
            cells.push(vec![None; layout.columns_when(long_row)]);
            previous_long = long_row;
        }

        Self {
            layout,
            cells,
            bubbles: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn columns(&self) -> usize {
        self.layout.columns
    }

    // =========================================================================
    // COORDINATES
    // =========================================================================

    /// Length parity of a stored row, `None` if the row does not exist.
    pub fn row_length_parity(&self, row: usize) -> Option<usize> {
        self.cells.get(row).map(|cells| cells.len() % 2)
    }

    /// Whether a row is shifted by half a tile, `None` if the row does not
    /// exist.
    pub fn is_long_row(&self, row: usize) -> Option<bool> {
        self.row_length_parity(row)
            .map(|parity| parity.abs_diff(self.layout.column_parity()) == 1)
    }

    pub fn columns_for_row(&self, row: usize) -> Option<usize> {
        self.is_long_row(row).map(|long| self.layout.columns_when(long))
    }

    pub fn in_bounds(&self, cell: RowCol) -> bool {
        match self.columns_for_row(cell.row) {
            Some(columns) => cell.row < self.layout.rows && cell.column < columns,
            None => false,
        }
    }

    /// World position of a cell center.
    pub fn coordinate_of(&self, cell: RowCol) -> Vec2 {
        let GridLayout {
            tile_width,
            tile_height,
            origin,
            ..
        } = self.layout;

        let mut x = (cell.column as f32 + 1.0) * tile_width - tile_width * 0.5 + origin.x;
        if self.is_long_row(cell.row).unwrap_or(false) {
            x += tile_width * 0.5;
        }
        let y = (cell.row as f32 + 1.0) * tile_height - tile_height * 0.5 + origin.y;
        Vec2::new(x, y)
    }

    /// Nearest cell to a world position, clamped onto the board.
    pub fn row_col_of(&self, position: Vec2) -> RowCol {
        let GridLayout {
            rows,
            tile_width,
            tile_height,
            origin,
            ..
        } = self.layout;

        let row = ((position.y - origin.y + tile_height * 0.5) / tile_height - 1.0).round();
        let row = clamp_index(row, rows);

        let long_row = self.is_long_row(row).unwrap_or(false);
        let x = if long_row {
            position.x - tile_width * 0.5
        } else {
            position.x
        };
        let column = ((x - origin.x + tile_width * 0.5) / tile_width - 1.0).round();
        let columns = self.columns_for_row(row).unwrap_or(self.layout.columns);
        let column = clamp_index(column, columns);

        RowCol::new(row, column)
    }

    /// Whether a world point lies in the top tile band, where a bubble rests
    /// against the ceiling.
    pub fn is_anchor_position(&self, position: Vec2) -> bool {
        position.y <= self.layout.tile_height * 0.5 + self.layout.origin.y
    }

    // =========================================================================
    // OCCUPANCY
    // =========================================================================

    /// Id of the bubble in a cell. Out-of-bounds cells are simply empty.
    pub fn bubble_id_at(&self, cell: RowCol) -> Option<BubbleId> {
        self.cells.get(cell.row)?.get(cell.column).copied().flatten()
    }

    /// The bubble in a cell, if any.
    pub fn get(&self, cell: RowCol) -> Option<&Bubble> {
        self.bubble_id_at(cell).and_then(|id| self.bubbles.get(&id))
    }

    pub fn is_occupied(&self, cell: RowCol) -> bool {
        self.bubble_id_at(cell).is_some()
    }

    /// The bubble in the cell under a world point.
    pub fn bubble_at_position(&self, position: Vec2) -> Option<&Bubble> {
        self.get(self.row_col_of(position))
    }

    pub fn bubble(&self, id: BubbleId) -> Option<&Bubble> {
        self.bubbles.get(&id)
    }

    pub fn contains(&self, id: BubbleId) -> bool {
        self.bubbles.contains_key(&id)
    }

    /// Put a bubble on a cell immediately, without easing.
    pub fn place(&mut self, cell: RowCol, mut bubble: Bubble) -> Result<BubbleId, PuzzleError> {
        self.check_vacant(cell)?;
        bubble.place(cell, self.coordinate_of(cell));
        Ok(self.store(cell, bubble))
    }

    /// Commit a projectile to a cell. The bubble eases toward the cell center
    /// over `settle_ticks`, but the cell is taken right away.
    pub fn commit(
        &mut self,
        cell: RowCol,
        mut bubble: Bubble,
        settle_ticks: u32,
    ) -> Result<BubbleId, PuzzleError> {
        self.check_vacant(cell)?;
        bubble.snap_to(cell, self.coordinate_of(cell), settle_ticks);
        Ok(self.store(cell, bubble))
    }

    fn check_vacant(&self, cell: RowCol) -> Result<(), PuzzleError> {
        if !self.in_bounds(cell) {
            return Err(PuzzleError::OutOfBounds { cell });
        }
        if self.is_occupied(cell) {
            return Err(PuzzleError::CellOccupied { cell });
        }
        Ok(())
    }

    fn store(&mut self, cell: RowCol, bubble: Bubble) -> BubbleId {
        let id = bubble.id();
        self.cells[cell.row][cell.column] = Some(id);
        self.bubbles.insert(id, bubble);
        id
    }

    /// Take a bubble out of a cell.
    pub fn remove(&mut self, cell: RowCol) -> Option<Bubble> {
        let slot = self.cells.get_mut(cell.row)?.get_mut(cell.column)?;
        let id = slot.take()?;
        let mut bubble = self.bubbles.remove(&id)?;
        bubble.detach();
        Some(bubble)
    }

    /// Take a bubble out of the grid by id.
    pub fn remove_id(&mut self, id: BubbleId) -> Option<Bubble> {
        let cell = self.bubbles.get(&id)?.cell()?;
        self.remove(cell)
    }

    /// Drop every bubble, keeping the row structure.
    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(None);
        }
        self.bubbles.clear();
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn row_is_empty(&self, row: usize) -> bool {
        self.cells
            .get(row)
            .is_none_or(|cells| cells.iter().all(Option::is_none))
    }

    /// Iterate over all snapped bubbles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Bubble> + '_ {
        self.cells
            .iter()
            .flatten()
            .filter_map(move |slot| slot.and_then(|id| self.bubbles.get(&id)))
    }

    /// Read-only view of the board: one entry per stored slot.
    pub fn snapshot(&self) -> Vec<Vec<Option<BubbleColor>>> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|slot| slot.and_then(|id| self.bubbles.get(&id)).map(|b| b.color))
                    .collect()
            })
            .collect()
    }

    /// Advance settle easing of every snapped bubble by one tick.
    pub(crate) fn advance_settles(&mut self) {
        for bubble in self.bubbles.values_mut() {
            bubble.advance_settle();
        }
    }

    // =========================================================================
    // NEIGHBORS
    // =========================================================================

    /// In-bounds cells around `cell` in offset-table order, paired with the
    /// offset that produced them. Occupancy is not checked.
    pub fn neighbor_cells(&self, cell: RowCol) -> Vec<((i32, i32), RowCol)> {
        let Some(long_row) = self.is_long_row(cell.row) else {
            return Vec::new();
        };
        offsets_for(long_row)
            .iter()
            .filter_map(|&offset| cell.offset(offset).map(|n| (offset, n)))
            .filter(|(_, n)| self.in_bounds(*n))
            .collect()
    }

    /// Occupied neighbors of a cell, in offset-table order.
    pub fn neighbors_of(&self, cell: RowCol, filter: NeighborFilter) -> Vec<&Bubble> {
        self.neighbor_cells(cell)
            .into_iter()
            .filter(|(offset, _)| filter.accepts(*offset))
            .filter_map(|(_, n)| self.get(n))
            .collect()
    }

    /// Occupied neighbors sharing the color of the bubble in `cell`.
    pub fn neighbors_same_color(&self, cell: RowCol) -> Vec<&Bubble> {
        let Some(color) = self.get(cell).map(|b| b.color) else {
            return Vec::new();
        };
        self.neighbors_of(cell, NeighborFilter::Normal)
            .into_iter()
            .filter(|b| b.color == color)
            .collect()
    }

    pub fn upper_neighbors(&self, cell: RowCol) -> Vec<&Bubble> {
        self.neighbors_of(cell, NeighborFilter::Upper)
    }

    pub fn lower_neighbors(&self, cell: RowCol) -> Vec<&Bubble> {
        self.neighbors_of(cell, NeighborFilter::Lower)
    }
}

/// Round-and-clamp a fractional index into `[0, len)`.
fn clamp_index(value: f32, len: usize) -> usize {
    let max = len.saturating_sub(1) as f32;
    value.clamp(0.0, max) as usize
}
