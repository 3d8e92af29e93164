//! Bubble entities - the units that fly, snap, pop and drop.
//!
//! A bubble is plain data. It owns its own visual state (position, velocity,
//! settle easing) while the grid owns the authoritative `(row, column)`
//! assignment. Rendering collaborators mirror bubbles through [`BubbleBody`].

use bevy::{color::Color, math::Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::hex::RowCol;

/// Packed RGB values of the bubble palette, indexed by [`BubbleColor`].
pub const PALETTE: [u32; 7] = [
    0x3B3433, 0xff0000, 0x0000ff, 0x00ff00, 0xffffff, 0xffff00, 0xff00ff,
];

/// Unique bubble identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BubbleId(pub u64);

impl std::fmt::Display for BubbleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out bubble ids. Owned by the board, never shared globally.
#[derive(Debug, Default, Clone)]
pub struct BubbleIds {
    next: u64,
}

impl BubbleIds {
    pub fn next_id(&mut self) -> BubbleId {
        let id = BubbleId(self.next);
        self.next += 1;
        id
    }
}

/// A bubble color, stored as an index into [`PALETTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BubbleColor(pub u8);

impl BubbleColor {
    /// Packed `0xRRGGBB` value. Indices past the palette wrap around.
    pub fn packed(self) -> u32 {
        PALETTE[self.0 as usize % PALETTE.len()]
    }

    /// Get the actual color for rendering.
    pub fn to_color(self) -> Color {
        let packed = self.packed();
        Color::srgb_u8((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
    }

    /// Pick a color uniformly from the first `palette_size` palette entries.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, palette_size: u8) -> Self {
        let size = palette_size.clamp(1, PALETTE.len() as u8);
        BubbleColor(rng.random_range(0..size))
    }
}

/// Where new bubble colors come from: a fixed cycle, or uniform random draws
/// when the cycle is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorSequence {
    order: Vec<BubbleColor>,
    counter: usize,
    palette_size: u8,
}

impl ColorSequence {
    pub fn new(order: Vec<BubbleColor>, palette_size: u8) -> Self {
        Self {
            order,
            counter: 0,
            palette_size,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        !self.order.is_empty()
    }

    /// Replace the cycle and restart it from the first entry.
    pub fn reset(&mut self, order: Vec<BubbleColor>) {
        self.order = order;
        self.counter = 0;
    }

    pub fn next_color<R: Rng + ?Sized>(&mut self, rng: &mut R) -> BubbleColor {
        if self.order.is_empty() {
            return BubbleColor::random(rng, self.palette_size);
        }
        let color = self.order[self.counter % self.order.len()];
        self.counter += 1;
        color
    }
}

/// Eases a bubble from where it hit the board to its cell center.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Settle {
    from: Vec2,
    to: Vec2,
    elapsed: u32,
    duration: u32,
}

/// A grid cell occupant or a projectile.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    id: BubbleId,
    pub color: BubbleColor,
    pub position: Vec2,
    pub velocity: Vec2,
    cell: Option<RowCol>,
    snapped: bool,
    popped: bool,
    dropped: bool,
    settle: Option<Settle>,
}

impl Bubble {
    pub fn new(id: BubbleId, color: BubbleColor, position: Vec2) -> Self {
        Self {
            id,
            color,
            position,
            velocity: Vec2::ZERO,
            cell: None,
            snapped: false,
            popped: false,
            dropped: false,
            settle: None,
        }
    }

    pub fn id(&self) -> BubbleId {
        self.id
    }

    /// The cell this bubble was committed to, `None` while in flight.
    pub fn cell(&self) -> Option<RowCol> {
        self.cell
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped
    }

    pub fn is_popped(&self) -> bool {
        self.popped
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    pub fn is_settling(&self) -> bool {
        self.settle.is_some()
    }

    /// Place the bubble directly on a cell, without easing.
    pub(crate) fn place(&mut self, cell: RowCol, center: Vec2) {
        self.cell = Some(cell);
        self.snapped = true;
        self.position = center;
        self.velocity = Vec2::ZERO;
        self.settle = None;
    }

    /// Commit the bubble to a cell and ease it toward the cell center.
    pub(crate) fn snap_to(&mut self, cell: RowCol, center: Vec2, settle_ticks: u32) {
        self.cell = Some(cell);
        self.snapped = true;
        self.velocity = Vec2::ZERO;
        if settle_ticks == 0 {
            self.position = center;
            self.settle = None;
        } else {
            self.settle = Some(Settle {
                from: self.position,
                to: center,
                elapsed: 0,
                duration: settle_ticks,
            });
        }
    }

    /// Forget the cell assignment once the bubble has left the grid.
    pub(crate) fn detach(&mut self) {
        self.cell = None;
    }

    /// Advance the settle easing by one tick.
    pub(crate) fn advance_settle(&mut self) {
        let Some(settle) = self.settle.as_mut() else {
            return;
        };
        settle.elapsed += 1;
        let t = (settle.elapsed as f32 / settle.duration as f32).min(1.0);
        let eased = t * t * (3.0 - 2.0 * t);
        self.position = settle.from.lerp(settle.to, eased);
        if settle.elapsed >= settle.duration {
            self.position = settle.to;
            self.settle = None;
        }
    }

    /// Mark the bubble popped. Returns `false` if it already was.
    pub fn pop(&mut self) -> bool {
        if self.popped {
            return false;
        }
        self.popped = true;
        self.settle = None;
        true
    }

    /// Mark the bubble dropped. Returns `false` if it already was.
    pub fn drop_away(&mut self) -> bool {
        if self.dropped {
            return false;
        }
        self.dropped = true;
        self.settle = None;
        true
    }
}

/// Thin adapter over whatever draws and simulates a bubble.
pub trait BubbleBody {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn destroy(&mut self);
}
