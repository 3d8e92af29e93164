//! Typed notifications published by the board.
//!
//! Scoring, UI and rendering subscribe by draining the board's event queue
//! once per tick, instead of registering listeners on individual objects.

use bevy::math::Vec2;

use super::{
    bubble::{BubbleColor, BubbleId},
    hex::RowCol,
};

/// The result of one snap resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardOutcome {
    pub popped: bool,
    /// Members of the popped group, empty when nothing popped.
    pub popped_group: Vec<BubbleId>,
    /// The projectile settled on the danger row without popping anything.
    pub crossed_boundary: bool,
    /// Row 0 holds no bubbles anymore.
    pub board_cleared: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PuzzleEvent {
    LevelLoaded {
        rows: usize,
        columns: usize,
        bubbles: usize,
    },
    /// The launcher loaded a new current projectile.
    ProjectileGenerated {
        bubble: BubbleId,
        color: BubbleColor,
    },
    ProjectileLaunched {
        bubble: BubbleId,
        velocity: Vec2,
    },
    /// A contact arrived while another snap was resolving and was queued.
    ContactDeferred { bubble: BubbleId },
    /// A queued contact was replaced by a newer one. The projectile is still
    /// in flight and may report contact again.
    ContactSuperseded { bubble: BubbleId },
    BubbleSnapped { bubble: BubbleId, cell: RowCol },
    BoardResolved(BoardOutcome),
    BubblesDropped { groups: Vec<Vec<BubbleId>> },
    BubblePopped { bubble: BubbleId },
    /// The bubble is gone for good; its body can be released.
    BubbleDestroyed { bubble: BubbleId },
    /// The snap engine is idle again.
    SnapSettled { bubble: BubbleId },
}
