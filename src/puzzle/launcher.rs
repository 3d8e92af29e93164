//! The launcher at the bottom of the board.
//!
//! The player drags from the launcher toward a target and releases to fire.
//! The launcher always holds a "current" bubble ready to fire and a "next"
//! bubble preview. While aiming it produces an aim path that reflects once
//! off the side walls.

use bevy::math::Vec2;
use rand::Rng;
use tracing::{debug, info};

use super::{
    bubble::{Bubble, BubbleColor, BubbleId, BubbleIds, ColorSequence},
    config::LauncherConfig,
    grid::GridLayout,
};

/// Rows of clearance between the bottom of the board and the default base.
const BASE_CLEARANCE_ROWS: f32 = 2.0;

/// Offset of the preview bubble from the base, as a fraction of a tile.
const PREVIEW_OFFSET: f32 = 0.33;

/// A straight piece of the aim guide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }
}

/// The aim guide: a primary segment and at most one wall reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimPath {
    pub primary: Segment,
    pub reflected: Option<Segment>,
}

impl AimPath {
    /// Points along the path every `spacing` units, starting at the base.
    pub fn sample(&self, spacing: f32) -> Vec<Vec2> {
        let spacing = spacing.max(f32::EPSILON);
        let mut points = Vec::new();
        for segment in std::iter::once(&self.primary).chain(self.reflected.as_ref()) {
            let length = segment.length();
            let direction = segment.direction();
            let steps = (length / spacing).floor() as usize;
            points.extend((0..=steps).map(|i| segment.start + direction * (i as f32 * spacing)));
        }
        points
    }

    pub fn end(&self) -> Vec2 {
        self.reflected.map_or(self.primary.end, |s| s.end)
    }
}

/// Compute the aim guide from `base` toward `pointer`.
///
/// The guide is `aim_length` long. If it would cross the left or right wall,
/// it stops at the wall and continues along the mirrored direction for the
/// remaining length. Only one bounce is modeled. Returns `None` when the
/// pointer sits on the base.
pub fn aim_path(
    base: Vec2,
    pointer: Vec2,
    aim_length: f32,
    left_wall: f32,
    right_wall: f32,
) -> Option<AimPath> {
    let direction = (pointer - base).try_normalize()?;
    let end = base + direction * aim_length;

    let wall = if direction.x < 0.0 && end.x < left_wall {
        Some(left_wall)
    } else if direction.x > 0.0 && end.x > right_wall {
        Some(right_wall)
    } else {
        None
    };

    let Some(wall) = wall else {
        return Some(AimPath {
            primary: Segment { start: base, end },
            reflected: None,
        });
    };

    let travel = ((wall - base.x) / direction.x).clamp(0.0, aim_length);
    let hit = base + direction * travel;
    let mirrored = Vec2::new(-direction.x, direction.y);

    Some(AimPath {
        primary: Segment { start: base, end: hit },
        reflected: Some(Segment {
            start: hit,
            end: hit + mirrored * (aim_length - travel),
        }),
    })
}

/// Launcher geometry and feel, resolved against the board layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LauncherSettings {
    pub base: Vec2,
    pub aim_length: f32,
    pub launch_speed: f32,
    pub min_drag: f32,
    pub left_wall: f32,
    pub right_wall: f32,
    pub preview_offset: Vec2,
}

impl LauncherSettings {
    pub fn resolve(config: &LauncherConfig, layout: &GridLayout) -> Self {
        let default_base = Vec2::new(
            layout.origin.x + layout.width() * 0.5,
            layout.origin.y + (layout.rows as f32 + BASE_CLEARANCE_ROWS) * layout.tile_height,
        );
        let base = config.base.map(Vec2::from).unwrap_or(default_base);

        Self {
            base,
            aim_length: config
                .aim_length
                .unwrap_or((base.y - layout.origin.y).abs()),
            launch_speed: config.launch_speed,
            min_drag: config.min_drag.unwrap_or(layout.tile_width * 0.5),
            left_wall: layout.origin.x,
            right_wall: layout.origin.x + layout.width(),
            preview_offset: Vec2::splat(layout.tile_width * PREVIEW_OFFSET),
        }
    }
}

/// The launcher and its loaded projectiles.
#[derive(Debug, Clone)]
pub struct Launcher {
    settings: LauncherSettings,
    colors: ColorSequence,
    current: Option<Bubble>,
    next: Option<Bubble>,
    /// Last pointer position while aiming.
    aim: Option<Vec2>,
    paused: bool,
}

impl Launcher {
    pub fn new(settings: LauncherSettings, colors: ColorSequence) -> Self {
        Self {
            settings,
            colors,
            current: None,
            next: None,
            aim: None,
            paused: false,
        }
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn current(&self) -> Option<&Bubble> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&Bubble> {
        self.next.as_ref()
    }

    pub fn is_aiming(&self) -> bool {
        self.aim.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Load a current projectile if the launcher is empty, promoting the
    /// preview, and refill the preview. Returns the newly loaded projectile.
    pub fn reload<R: Rng + ?Sized>(&mut self, ids: &mut BubbleIds, rng: &mut R) -> Option<&Bubble> {
        let mut loaded = false;

        if self.current.is_none() {
            let mut bubble = match self.next.take() {
                Some(bubble) => bubble,
                None => Bubble::new(ids.next_id(), self.colors.next_color(rng), self.settings.base),
            };
            bubble.position = self.settings.base;
            self.current = Some(bubble);
            loaded = true;
        }

        if self.next.is_none() {
            let position = self.settings.base + self.settings.preview_offset;
            self.next = Some(Bubble::new(ids.next_id(), self.colors.next_color(rng), position));
        }

        if loaded {
            if let Some(current) = &self.current {
                debug!("Launcher loaded {} with color {:?}", current.id(), current.color);
            }
            self.current.as_ref()
        } else {
            None
        }
    }

    /// Discard both loaded projectiles and load fresh ones. Returns the ids of
    /// the discarded bubbles.
    pub fn regenerate<R: Rng + ?Sized>(
        &mut self,
        ids: &mut BubbleIds,
        rng: &mut R,
    ) -> Vec<BubbleId> {
        self.aim = None;
        let discarded = [self.current.take(), self.next.take()]
            .into_iter()
            .flatten()
            .map(|b| b.id())
            .collect();
        self.reload(ids, rng);
        discarded
    }

    /// Switch to a fixed color cycle and regenerate both projectiles from it.
    pub fn set_color_order<R: Rng + ?Sized>(
        &mut self,
        order: Vec<BubbleColor>,
        ids: &mut BubbleIds,
        rng: &mut R,
    ) -> Vec<BubbleId> {
        self.colors.reset(order);
        self.regenerate(ids, rng)
    }

    /// Start aiming. Refused while paused or empty.
    pub fn begin_aim(&mut self, pointer: Vec2) -> bool {
        if self.paused || self.current.is_none() {
            return false;
        }
        self.aim = Some(pointer);
        true
    }

    /// Track the pointer while aiming. Returns the aim guide, or `None` when
    /// not aiming or when the drag is still too short to fire.
    pub fn update_aim(&mut self, pointer: Vec2) -> Option<AimPath> {
        let aim = self.aim.as_mut()?;
        *aim = pointer;
        if self.drag_distance(pointer) < self.settings.min_drag {
            return None;
        }
        self.aim_path(pointer)
    }

    pub fn cancel_aim(&mut self) {
        self.aim = None;
    }

    /// Aim guide toward a pointer, using the launcher's walls and length.
    pub fn aim_path(&self, pointer: Vec2) -> Option<AimPath> {
        let s = &self.settings;
        aim_path(s.base, pointer, s.aim_length, s.left_wall, s.right_wall)
    }

    /// Finish aiming. Fires the current projectile toward `pointer` unless
    /// the drag was shorter than the minimum, in which case the aim is simply
    /// cancelled.
    pub fn release(&mut self, pointer: Vec2) -> Option<Bubble> {
        self.aim.take()?;

        if self.drag_distance(pointer) < self.settings.min_drag {
            debug!("Drag too short, aim cancelled");
            return None;
        }

        let direction = (pointer - self.settings.base).try_normalize()?;
        let mut bubble = self.current.take()?;
        bubble.position = self.settings.base;
        bubble.velocity = direction * self.settings.launch_speed;

        info!(
            "Fired {} ({:?}) in direction {:?}",
            bubble.id(),
            bubble.color,
            direction
        );
        Some(bubble)
    }

    /// Pausing drops any aim in progress.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.aim = None;
        }
    }

    fn drag_distance(&self, pointer: Vec2) -> f32 {
        pointer.distance(self.settings.base)
    }
}
