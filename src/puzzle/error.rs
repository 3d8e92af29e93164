//! Errors surfaced by the puzzle core.
//!
//! Grid queries never fail; they clamp or return empty results. Only
//! invariant violations and bad input documents become errors.

use thiserror::Error;

use super::{bubble::BubbleId, hex::RowCol};

#[derive(Debug, Error)]
pub enum PuzzleError {
    /// The snap target resolved to a cell that already holds a bubble. The
    /// boundary and clear checks upstream are supposed to make this
    /// impossible.
    #[error("snap target {cell} is already occupied")]
    SnapTargetOccupied { cell: RowCol },

    #[error("bubble {0} is not in flight")]
    UnknownProjectile(BubbleId),

    #[error("cell {cell} is already occupied")]
    CellOccupied { cell: RowCol },

    #[error("cell {cell} is outside the board")]
    OutOfBounds { cell: RowCol },

    #[error("invalid puzzle configuration: {0}")]
    Config(#[from] serde_json::Error),
}
