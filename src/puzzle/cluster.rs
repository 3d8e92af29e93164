//! Cluster detection - connected groups of bubbles.
//!
//! Uses flood fill (BFS) over the neighbor graph. The same walk serves two
//! purposes: same-color groups that pop, and any-color islands that have
//! lost their connection to the top row and fall away.
//!
//! Result order is queue order. It is stable for a given board, but callers
//! should treat groups as sets.

use std::collections::{HashSet, VecDeque};

use super::{bubble::BubbleId, grid::PuzzleGrid, hex::NeighborFilter};

/// Collect every bubble reachable from `start`, including `start` itself.
///
/// With `same_color_only` the walk only follows neighbors of the start
/// bubble's color. Returns an empty group if `start` is not on the grid.
pub fn trace(grid: &PuzzleGrid, start: BubbleId, same_color_only: bool) -> Vec<BubbleId> {
    let Some(origin) = grid.bubble(start) else {
        return Vec::new();
    };
    let color = origin.color;

    let mut group = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();

    seen.insert(start);
    queue.push_back(start);

    while let Some(id) = queue.pop_front() {
        group.push(id);

        let Some(cell) = grid.bubble(id).and_then(|b| b.cell()) else {
            continue;
        };

        for neighbor in grid.neighbors_of(cell, NeighborFilter::Normal) {
            if same_color_only && neighbor.color != color {
                continue;
            }
            if seen.insert(neighbor.id()) {
                queue.push_back(neighbor.id());
            }
        }
    }

    group
}

/// Find every connected group with no member in row 0.
pub fn find_floating_groups(grid: &PuzzleGrid) -> Vec<Vec<BubbleId>> {
    let mut floating = Vec::new();
    let mut processed = HashSet::new();

    for bubble in grid.iter() {
        let Some(cell) = bubble.cell() else {
            continue;
        };
        // Row 0 rests against the ceiling; its groups are anchored.
        if cell.row == 0 || processed.contains(&bubble.id()) {
            continue;
        }

        let group = trace(grid, bubble.id(), false);
        let anchored = group
            .iter()
            .filter_map(|id| grid.bubble(*id).and_then(|b| b.cell()))
            .any(|c| c.row == 0);
        processed.extend(group.iter().copied());

        if !anchored {
            floating.push(group);
        }
    }

    floating
}
