//! Level setup - builds the starting grid.
//!
//! Two sources: procedural fill of the top rows, or a textual layout where
//! each character is a color digit or `x` for an empty slot.

use bevy::math::Vec2;
use rand::Rng;
use tracing::{debug, info, warn};

use super::{
    bubble::{Bubble, BubbleColor, BubbleIds, ColorSequence},
    config::{DEFAULT_COLUMNS, DEFAULT_INIT_ROWS, DEFAULT_ROWS, LevelConfig},
    grid::{GridLayout, PuzzleGrid},
    hex::RowCol,
};

/// Marker for an empty slot in a textual layout (case-insensitive).
const EMPTY_SLOT: char = 'x';

/// A parsed textual layout, one entry per character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLayout {
    pub rows: Vec<Vec<Option<BubbleColor>>>,
}

impl ParsedLayout {
    /// Widest row in the layout.
    pub fn max_columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Parse a newline separated layout. Characters that are neither digits nor
/// the empty marker are logged and left as empty slots; parsing never stops
/// early. Trailing blank lines are ignored.
pub fn parse_layout(text: &str) -> ParsedLayout {
    let mut rows: Vec<Vec<Option<BubbleColor>>> = text
        .split('\n')
        .enumerate()
        .map(|(line_no, line)| {
            line.trim_end_matches('\r')
                .chars()
                .enumerate()
                .map(|(column, ch)| parse_slot(line_no, column, ch))
                .collect()
        })
        .collect();

    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }

    ParsedLayout { rows }
}

fn parse_slot(line: usize, column: usize, ch: char) -> Option<BubbleColor> {
    if ch.eq_ignore_ascii_case(&EMPTY_SLOT) {
        return None;
    }
    match ch.to_digit(10) {
        Some(digit) => Some(BubbleColor(digit as u8)),
        None => {
            warn!("Layout line {line}, column {column}: '{ch}' is not a color digit");
            None
        }
    }
}

/// Grid geometry for a level, before any bubble is placed.
fn layout_for(config: &LevelConfig, rows: usize, columns: usize) -> GridLayout {
    GridLayout {
        rows: rows.max(1),
        // Long rows hold `columns - 1` slots.
        columns: columns.max(2),
        tile_width: config.tile_width(),
        tile_height: config.tile_height(),
        origin: Vec2::from(config.origin),
    }
}

/// Build the starting grid for a level.
pub fn build_grid<R: Rng + ?Sized>(
    config: &LevelConfig,
    colors: &mut ColorSequence,
    ids: &mut BubbleIds,
    rng: &mut R,
) -> PuzzleGrid {
    let grid = match config.layout.as_deref() {
        Some(text) => build_from_layout(config, &parse_layout(text), ids),
        None => build_procedural(config, colors, ids, rng),
    };

    info!(
        "Level ready: {} rows x {} columns, {} bubbles",
        grid.rows(),
        grid.columns(),
        grid.len()
    );
    grid
}

/// Fill every slot of the first `init_rows` rows.
pub fn build_procedural<R: Rng + ?Sized>(
    config: &LevelConfig,
    colors: &mut ColorSequence,
    ids: &mut BubbleIds,
    rng: &mut R,
) -> PuzzleGrid {
    let layout = layout_for(
        config,
        config.rows.unwrap_or(DEFAULT_ROWS),
        config.columns.unwrap_or(DEFAULT_COLUMNS),
    );
    let mut grid = PuzzleGrid::new(layout);
    let init_rows = config.init_rows.unwrap_or(DEFAULT_INIT_ROWS).min(grid.rows());

    for row in 0..init_rows {
        let columns = grid.columns_for_row(row).unwrap_or(0);
        for column in 0..columns {
            let bubble = Bubble::new(ids.next_id(), colors.next_color(rng), Vec2::ZERO);
            // Every slot of a fresh row is vacant and in bounds.
            if let Err(err) = grid.place(RowCol::new(row, column), bubble) {
                warn!("Skipping procedural slot: {err}");
            }
        }
    }

    grid
}

/// Build a grid from a parsed layout. Row and column counts come from the
/// layout unless the config overrides them.
pub fn build_from_layout(
    config: &LevelConfig,
    parsed: &ParsedLayout,
    ids: &mut BubbleIds,
) -> PuzzleGrid {
    let rows = config
        .rows
        .unwrap_or(if parsed.rows.is_empty() { DEFAULT_ROWS } else { parsed.rows.len() });
    let columns = config.columns.unwrap_or(match parsed.max_columns() {
        0 => DEFAULT_COLUMNS,
        widest => widest,
    });

    let layout = layout_for(config, rows, columns);
    let mut grid = PuzzleGrid::with_row_lengths(layout, parsed.rows.iter().map(Vec::len));
    let fill_rows = config.init_rows.unwrap_or(parsed.rows.len()).min(grid.rows());

    for (row, slots) in parsed.rows.iter().enumerate().take(fill_rows) {
        for (column, slot) in slots.iter().enumerate() {
            let Some(color) = slot else {
                continue;
            };
            let cell = RowCol::new(row, column);
            if !grid.in_bounds(cell) {
                warn!("Layout slot {cell} lies outside the board, dropping it");
                continue;
            }
            let bubble = Bubble::new(ids.next_id(), *color, Vec2::ZERO);
            if let Err(err) = grid.place(cell, bubble) {
                warn!("Skipping layout slot: {err}");
            }
        }
    }

    if parsed.rows.len() > grid.rows() {
        debug!(
            "Layout has {} rows, board keeps {}",
            parsed.rows.len(),
            grid.rows()
        );
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_parse_layout_keeps_slot_positions() {
        let parsed = parse_layout("1x1\nxxx\n101");
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.max_columns(), 3);
        assert_eq!(parsed.rows[0], vec![Some(BubbleColor(1)), None, Some(BubbleColor(1))]);
        assert_eq!(parsed.rows[1], vec![None, None, None]);
        assert_eq!(parsed.rows[2][1], Some(BubbleColor(0)));
    }

    #[test]
    fn test_malformed_characters_are_skipped() {
        let parsed = parse_layout("1?2\r\nX#3\n\n");
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0], vec![Some(BubbleColor(1)), None, Some(BubbleColor(2))]);
        assert_eq!(parsed.rows[1], vec![None, None, Some(BubbleColor(3))]);
    }

    #[test]
    fn test_procedural_fills_init_rows() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = BubbleIds::default();
        let mut colors = ColorSequence::new(Vec::new(), 7);
        let grid = build_procedural(&LevelConfig::default(), &mut colors, &mut ids, &mut rng);

        assert_eq!(grid.rows(), 11);
        assert_eq!(grid.columns(), 8);
        // 8 + 7 + 8 + 7 + 8
        assert_eq!(grid.len(), 38);
        assert!(grid.row_is_empty(5));
        for bubble in grid.iter() {
            let cell = bubble.cell().unwrap();
            assert_eq!(bubble.position, grid.coordinate_of(cell));
        }
    }

    #[test]
    fn test_single_column_request_is_widened() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = BubbleIds::default();
        let mut colors = ColorSequence::new(Vec::new(), 7);
        let config = LevelConfig {
            columns: Some(1),
            init_rows: Some(4),
            ..LevelConfig::default()
        };
        let grid = build_procedural(&config, &mut colors, &mut ids, &mut rng);

        assert_eq!(grid.columns(), 2);
        for row in 0..4 {
            assert!(!grid.row_is_empty(row));
        }
    }

    #[test]
    fn test_procedural_cyclic_colors() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = BubbleIds::default();
        let mut colors = ColorSequence::new(vec![BubbleColor(2), BubbleColor(5)], 7);
        let config = LevelConfig {
            init_rows: Some(1),
            columns: Some(4),
            ..LevelConfig::default()
        };
        let grid = build_procedural(&config, &mut colors, &mut ids, &mut rng);
        let row: Vec<_> = grid.snapshot()[0].clone();
        assert_eq!(
            row,
            vec![
                Some(BubbleColor(2)),
                Some(BubbleColor(5)),
                Some(BubbleColor(2)),
                Some(BubbleColor(5)),
            ]
        );
    }

    #[test]
    fn test_layout_rows_override_extends_board() {
        let mut ids = BubbleIds::default();
        let config = LevelConfig {
            rows: Some(6),
            ..LevelConfig::with_layout("11x\nx2")
        };
        let grid = build_from_layout(&config, &parse_layout("11x\nx2"), &mut ids);
        assert_eq!(grid.rows(), 6);
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.is_long_row(1), Some(true));
        assert_eq!(grid.is_long_row(2), Some(false));
        assert_eq!(grid.is_long_row(5), Some(true));
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_layout_respects_explicit_init_rows() {
        let mut ids = BubbleIds::default();
        let config = LevelConfig {
            init_rows: Some(1),
            ..LevelConfig::default()
        };
        let grid = build_from_layout(&config, &parse_layout("12\n3\n45"), &mut ids);
        assert_eq!(grid.len(), 2);
        assert!(grid.row_is_empty(2));
    }
}
