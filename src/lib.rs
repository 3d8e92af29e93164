//! Puzzle grid core for a hex-offset bubble shooter.
//!
//! [`PuzzleBoard`] owns the grid, the launcher and the snap engine and can be
//! driven headlessly, one tick at a time. [`PuzzlePlugin`] mounts it in a Bevy
//! app.

pub mod puzzle;

pub use puzzle::*;
