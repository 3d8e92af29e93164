//! The puzzle core of the bubble shooter.
//!
//! This module contains all the board logic including:
//! - Hex-offset grid addressing and neighbor topology
//! - Bubble data and colors
//! - Cluster detection for pops and floating islands
//! - Snap resolution and its deferred follow-up work
//! - The launcher and its aim guide
//! - Level setup from procedural fill or textual layouts
//!
//! Only [`plugin`] touches the ECS; the rest runs headlessly.

pub mod board;
pub mod bubble;
pub mod cluster;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod hex;
pub mod launcher;
pub mod level;
pub mod plugin;
pub mod schedule;
pub mod snap;

pub use board::{ContactOutcome, PuzzleBoard};
pub use bubble::{Bubble, BubbleBody, BubbleColor, BubbleId, PALETTE};
pub use config::{LauncherConfig, LevelConfig, PuzzleConfig, RuleConfig, TimingConfig};
pub use error::PuzzleError;
pub use events::{BoardOutcome, PuzzleEvent};
pub use grid::{GridLayout, PuzzleGrid};
pub use hex::{NeighborFilter, RowCol, Touching};
pub use launcher::{AimPath, Launcher, Segment};
pub use plugin::{BubbleContact, Puzzle, PuzzleMessage, PuzzlePlugin, PuzzleSystems};
pub use snap::{Contact, SnapState};
