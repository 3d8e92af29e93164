//! Puzzle configuration, loadable from JSON.
//!
//! Every field has a default, so `{}` is a valid document and partial
//! documents only override what they mention.

use serde::{Deserialize, Serialize};

use super::error::PuzzleError;

/// Default board height in rows.
pub const DEFAULT_ROWS: usize = 11;

/// Default board width in columns.
pub const DEFAULT_COLUMNS: usize = 8;

/// Number of rows filled when a procedural level starts.
pub const DEFAULT_INIT_ROWS: usize = 5;

/// Default tile edge in world units.
pub const DEFAULT_TILE_SIZE: f32 = 90.0;

/// Minimum same-color group that pops (match-3).
pub const DEFAULT_MIN_GROUP_SIZE: usize = 3;

/// Speed of a launched projectile in units per second.
pub const DEFAULT_LAUNCH_SPEED: f32 = 2500.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub level: LevelConfig,
    pub rules: RuleConfig,
    pub launcher: LauncherConfig,
    pub timing: TimingConfig,
    /// Seed for colors and drop delays. Unset seeds from the OS.
    pub seed: Option<u64>,
}

impl PuzzleConfig {
    pub fn from_json(json: &str) -> Result<Self, PuzzleError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Level shape and initial contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub rows: Option<usize>,
    pub columns: Option<usize>,
    pub init_rows: Option<usize>,
    /// Newline separated rows of color digits, `x` marking empty slots.
    pub layout: Option<String>,
    pub tile_width: Option<f32>,
    /// Defaults to `tile_width`.
    pub tile_height: Option<f32>,
    /// Top-left corner of the grid in world space.
    pub origin: [f32; 2],
}

impl LevelConfig {
    pub fn with_layout(layout: impl Into<String>) -> Self {
        Self {
            layout: Some(layout.into()),
            ..Self::default()
        }
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width.unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height.unwrap_or_else(|| self.tile_width())
    }
}

/// Pop and loss rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub min_group_size: usize,
    /// Row on which a non-popping snap ends the game. Defaults to the last row.
    pub danger_row: Option<usize>,
    /// How many palette entries random colors are drawn from.
    pub palette_size: u8,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            danger_row: None,
            palette_size: super::bubble::PALETTE.len() as u8,
        }
    }
}

impl RuleConfig {
    /// Effective pop threshold, never below one.
    pub fn min_group(&self) -> usize {
        self.min_group_size.max(1)
    }
}

/// Launcher placement and feel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Launcher position. Defaults to centered, two rows below the board.
    pub base: Option<[f32; 2]>,
    /// Length of the aim guide. Defaults to the distance from the base to
    /// the top of the board.
    pub aim_length: Option<f32>,
    pub launch_speed: f32,
    /// Drags shorter than this cancel instead of firing. Defaults to half a
    /// tile.
    pub min_drag: Option<f32>,
    /// Fixed cyclic color sequence. Empty means random colors.
    pub color_order: Vec<u8>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            base: None,
            aim_length: None,
            launch_speed: DEFAULT_LAUNCH_SPEED,
            min_drag: None,
            color_order: Vec::new(),
        }
    }
}

/// Deferred-work timings, in board ticks (one per fixed timestep in the Bevy
/// adapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between consecutive pops in a group.
    pub pop_stagger_ticks: u64,
    /// How long a snapped bubble eases into its cell.
    pub settle_ticks: u32,
    /// Pop animation length before a bubble is destroyed.
    pub pop_anim_ticks: u64,
    /// Delay before the launcher loads the next projectile.
    pub reload_ticks: u64,
    /// Dropped bubbles pop after a random delay in this range.
    pub drop_delay_min_ticks: u64,
    pub drop_delay_max_ticks: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pop_stagger_ticks: 6,
            settle_ticks: 6,
            pop_anim_ticks: 12,
            reload_ticks: 12,
            drop_delay_min_ticks: 15,
            drop_delay_max_ticks: 30,
        }
    }
}
