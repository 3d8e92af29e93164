//! The puzzle board - grid, launcher and snap engine behind one facade.
//!
//! Everything that mutates the grid goes through [`PuzzleBoard`]. Contacts
//! are resolved one at a time; the follow-up work of a snap (staggered pops,
//! the board event, drops, reloading the launcher) is scheduled on the
//! board's tick clock and runs from [`PuzzleBoard::tick`].

use bevy::math::Vec2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use super::{
    bubble::{Bubble, BubbleBody, BubbleColor, BubbleId, BubbleIds, ColorSequence},
    cluster,
    config::{LevelConfig, PuzzleConfig},
    error::PuzzleError,
    events::{BoardOutcome, PuzzleEvent},
    grid::PuzzleGrid,
    hex::{RowCol, Touching},
    launcher::{AimPath, Launcher, LauncherSettings},
    level,
    schedule::{Scheduler, Tick},
    snap::{self, Contact, PendingContact, SnapState},
};

/// Projectiles touch a grid bubble when their centers are this many tiles
/// apart.
const CONTACT_DISTANCE: f32 = 0.9;

/// Axis deltas below this fraction of a tile do not count as touching.
const CONTACT_DEAD_ZONE: f32 = 0.1;

/// Deferred board work.
#[derive(Debug, Clone, PartialEq)]
enum BoardTask {
    Pop(BubbleId),
    Destroy(BubbleId),
    Publish(BoardOutcome),
    Release { bubble: BubbleId, reload: bool },
    Reload,
}

/// What happened to a reported contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// The projectile was committed to this cell.
    Snapped(RowCol),
    /// Another snap is resolving; the contact is queued.
    Deferred,
}

#[derive(Debug)]
pub struct PuzzleBoard {
    config: PuzzleConfig,
    grid: PuzzleGrid,
    launcher: Launcher,
    scheduler: Scheduler<BoardTask>,
    events: Vec<PuzzleEvent>,
    ids: BubbleIds,
    rng: StdRng,
    /// Launched projectiles not yet committed to the grid.
    in_flight: HashMap<BubbleId, Bubble>,
    /// Bubbles that left the grid and are waiting to pop or be destroyed.
    departing: HashMap<BubbleId, Bubble>,
    state: SnapState,
    pending: Option<PendingContact>,
    min_group: usize,
    danger_row: usize,
}

impl PuzzleBoard {
    pub fn new(config: PuzzleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let grid = PuzzleGrid::default();
        let launcher = Launcher::new(
            LauncherSettings::resolve(&config.launcher, grid.layout()),
            ColorSequence::default(),
        );

        let mut board = Self {
            config,
            grid,
            launcher,
            scheduler: Scheduler::default(),
            events: Vec::new(),
            ids: BubbleIds::default(),
            rng,
            in_flight: HashMap::new(),
            departing: HashMap::new(),
            state: SnapState::Idle,
            pending: None,
            min_group: 1,
            danger_row: 0,
        };
        board.reset();
        board
    }

    /// Parse a JSON configuration document and build a board from it.
    pub fn from_json(json: &str) -> Result<Self, PuzzleError> {
        Ok(Self::new(PuzzleConfig::from_json(json)?))
    }

    /// Rebuild the current level from scratch.
    pub fn reset(&mut self) {
        self.load_level(self.config.level.clone());
    }

    /// Replace the board with a new level. Pending work of the old level is
    /// discarded.
    pub fn load_level(&mut self, level: LevelConfig) {
        self.scheduler.clear();
        self.in_flight.clear();
        self.departing.clear();
        self.pending = None;
        self.state = SnapState::Idle;

        let palette_size = self.config.rules.palette_size;
        let mut colors = ColorSequence::new(Vec::new(), palette_size);
        self.grid = level::build_grid(&level, &mut colors, &mut self.ids, &mut self.rng);
        self.config.level = level;

        let rules = &self.config.rules;
        self.min_group = rules.min_group();
        let last_row = self.grid.rows() - 1;
        self.danger_row = rules.danger_row.unwrap_or(last_row).min(last_row);

        let order = self.config.launcher.color_order.iter().copied().map(BubbleColor).collect();
        self.launcher = Launcher::new(
            LauncherSettings::resolve(&self.config.launcher, self.grid.layout()),
            ColorSequence::new(order, palette_size),
        );

        self.events.push(PuzzleEvent::LevelLoaded {
            rows: self.grid.rows(),
            columns: self.grid.columns(),
            bubbles: self.grid.len(),
        });
        self.reload_launcher();
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    pub fn grid(&self) -> &PuzzleGrid {
        &self.grid
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn state(&self) -> SnapState {
        self.state
    }

    pub fn is_resolving(&self) -> bool {
        self.state.is_resolving()
    }

    /// The projectile whose contact is queued, if any.
    pub fn pending_contact(&self) -> Option<BubbleId> {
        self.pending.map(|p| p.bubble)
    }

    pub fn now(&self) -> Tick {
        self.scheduler.now()
    }

    pub fn projectile(&self, id: BubbleId) -> Option<&Bubble> {
        self.in_flight.get(&id)
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Bubble> + '_ {
        self.in_flight.values()
    }

    /// Any live bubble: on the grid, in flight, departing or loaded in the
    /// launcher.
    pub fn bubble(&self, id: BubbleId) -> Option<&Bubble> {
        self.grid
            .bubble(id)
            .or_else(|| self.in_flight.get(&id))
            .or_else(|| self.departing.get(&id))
            .or_else(|| self.launcher.current().filter(|b| b.id() == id))
            .or_else(|| self.launcher.next().filter(|b| b.id() == id))
    }

    pub fn coordinate_of(&self, cell: RowCol) -> Vec2 {
        self.grid.coordinate_of(cell)
    }

    pub fn row_col_of(&self, position: Vec2) -> RowCol {
        self.grid.row_col_of(position)
    }

    pub fn find_floating_groups(&self) -> Vec<Vec<BubbleId>> {
        cluster::find_floating_groups(&self.grid)
    }

    /// Take every event published since the last call.
    pub fn drain_events(&mut self) -> Vec<PuzzleEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // LAUNCHER
    // =========================================================================

    pub fn begin_aim(&mut self, pointer: Vec2) -> bool {
        self.launcher.begin_aim(pointer)
    }

    pub fn update_aim(&mut self, pointer: Vec2) -> Option<AimPath> {
        self.launcher.update_aim(pointer)
    }

    pub fn cancel_aim(&mut self) {
        self.launcher.cancel_aim();
    }

    /// Release the aim and fire. Returns the launched projectile.
    pub fn release_aim(&mut self, pointer: Vec2) -> Option<BubbleId> {
        let bubble = self.launcher.release(pointer)?;
        Some(self.launch(bubble))
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.launcher.set_paused(paused);
    }

    /// Switch the launcher to a fixed color cycle. Both loaded projectiles
    /// are replaced.
    pub fn set_color_order(&mut self, order: &[u8]) {
        let order = order.iter().copied().map(BubbleColor).collect();
        let discarded = self.launcher.set_color_order(order, &mut self.ids, &mut self.rng);
        self.events
            .extend(discarded.into_iter().map(|bubble| PuzzleEvent::BubbleDestroyed { bubble }));
        if let Some(current) = self.launcher.current() {
            self.events.push(PuzzleEvent::ProjectileGenerated {
                bubble: current.id(),
                color: current.color,
            });
        }
    }

    /// Dotted aim guide toward `pointer`, cut off at the first point that
    /// lands on an occupied cell.
    pub fn aim_guide(&self, pointer: Vec2, spacing: f32) -> Vec<Vec2> {
        let Some(path) = self.launcher.aim_path(pointer) else {
            return Vec::new();
        };
        path.sample(spacing)
            .into_iter()
            .take_while(|point| self.grid.bubble_at_position(*point).is_none())
            .collect()
    }

    /// Put a projectile in flight without going through the launcher.
    pub fn inject_projectile(
        &mut self,
        color: BubbleColor,
        position: Vec2,
        velocity: Vec2,
    ) -> BubbleId {
        let mut bubble = Bubble::new(self.ids.next_id(), color, position);
        bubble.velocity = velocity;
        self.launch(bubble)
    }

    fn launch(&mut self, bubble: Bubble) -> BubbleId {
        let id = bubble.id();
        self.events.push(PuzzleEvent::ProjectileLaunched {
            bubble: id,
            velocity: bubble.velocity,
        });
        self.in_flight.insert(id, bubble);
        id
    }

    fn reload_launcher(&mut self) {
        if let Some(loaded) = self.launcher.reload(&mut self.ids, &mut self.rng) {
            self.events.push(PuzzleEvent::ProjectileGenerated {
                bubble: loaded.id(),
                color: loaded.color,
            });
        }
    }

    // =========================================================================
    // PLACEMENT
    // =========================================================================

    /// Put a bubble straight onto a cell. No pop resolution runs.
    pub fn place_bubble(
        &mut self,
        cell: RowCol,
        color: BubbleColor,
    ) -> Result<BubbleId, PuzzleError> {
        let bubble = Bubble::new(self.ids.next_id(), color, Vec2::ZERO);
        self.grid.place(cell, bubble)
    }

    /// Detach every floating group from the grid. Each bubble pops after a
    /// random delay and is destroyed after its pop animation.
    pub fn drop_all_floating_bubbles(&mut self) -> Vec<Vec<BubbleId>> {
        let groups = self.find_floating_groups();
        if groups.is_empty() {
            return groups;
        }

        let timing = &self.config.timing;
        let low = timing.drop_delay_min_ticks.min(timing.drop_delay_max_ticks);
        let high = timing.drop_delay_min_ticks.max(timing.drop_delay_max_ticks);

        for id in groups.iter().flatten() {
            let Some(mut bubble) = self.grid.remove_id(*id) else {
                continue;
            };
            bubble.drop_away();
            self.departing.insert(*id, bubble);
            let delay = self.rng.random_range(low..=high);
            self.scheduler.schedule_in(delay, BoardTask::Pop(*id));
        }

        info!(
            "Dropped {} floating bubbles in {} groups",
            groups.iter().map(Vec::len).sum::<usize>(),
            groups.len()
        );
        self.events.push(PuzzleEvent::BubblesDropped {
            groups: groups.clone(),
        });
        groups
    }

    // =========================================================================
    // SNAP RESOLUTION
    // =========================================================================

    /// A projectile touched the grid, optionally naming the bubble it hit.
    ///
    /// While another snap is resolving the contact is queued; a newer queued
    /// contact replaces an older one, whose projectile stays in flight.
    pub fn on_bubble_contact(
        &mut self,
        bubble: BubbleId,
        position: Vec2,
        contact: Option<Contact>,
    ) -> Result<ContactOutcome, PuzzleError> {
        if !self.in_flight.contains_key(&bubble) {
            return Err(PuzzleError::UnknownProjectile(bubble));
        }

        if self.state.is_resolving() {
            if let Some(replaced) = self.pending.filter(|p| p.bubble != bubble) {
                warn!("Contact of {} superseded by {}", replaced.bubble, bubble);
                self.events.push(PuzzleEvent::ContactSuperseded {
                    bubble: replaced.bubble,
                });
            }
            self.pending = Some(PendingContact {
                bubble,
                position,
                contact,
            });
            debug!("Deferred contact of {bubble} until the current snap settles");
            self.events.push(PuzzleEvent::ContactDeferred { bubble });
            return Ok(ContactOutcome::Deferred);
        }

        self.resolve(bubble, position, contact.as_ref())
            .map(ContactOutcome::Snapped)
    }

    fn resolve(
        &mut self,
        id: BubbleId,
        position: Vec2,
        contact: Option<&Contact>,
    ) -> Result<RowCol, PuzzleError> {
        let cell = snap::resolve_target(&self.grid, position, contact);
        if !self.grid.in_bounds(cell) {
            error!("Snap target {cell} for {id} is outside the grid");
            return Err(PuzzleError::OutOfBounds { cell });
        }
        if self.grid.is_occupied(cell) {
            error!("Snap target {cell} for {id} is already occupied");
            return Err(PuzzleError::SnapTargetOccupied { cell });
        }

        let mut bubble = self
            .in_flight
            .remove(&id)
            .ok_or(PuzzleError::UnknownProjectile(id))?;
        bubble.position = position;
        let timing = self.config.timing.clone();
        self.grid.commit(cell, bubble, timing.settle_ticks)?;
        debug!("Snapped {id} to {cell}");
        self.events.push(PuzzleEvent::BubbleSnapped { bubble: id, cell });

        let group = cluster::trace(&self.grid, id, true);
        let popped = group.len() >= self.min_group;
        if popped {
            for (i, member) in group.iter().enumerate() {
                if let Some(bubble) = self.grid.remove_id(*member) {
                    self.departing.insert(*member, bubble);
                    self.scheduler
                        .schedule_in(i as Tick * timing.pop_stagger_ticks, BoardTask::Pop(*member));
                }
            }
            info!("Popped a group of {} bubbles", group.len());
        }

        let crossed_boundary = !popped && cell.row >= self.danger_row;
        if crossed_boundary {
            info!("{id} settled on the danger row at {cell}");
        }

        let outcome = BoardOutcome {
            popped,
            popped_group: if popped { group.clone() } else { Vec::new() },
            crossed_boundary,
            board_cleared: popped && self.grid.row_is_empty(0),
        };

        let event_delay = group.len() as Tick * timing.pop_stagger_ticks;
        self.scheduler.schedule_in(event_delay, BoardTask::Publish(outcome));
        self.scheduler.schedule_in(
            event_delay.max(Tick::from(timing.settle_ticks)),
            BoardTask::Release {
                bubble: id,
                reload: !crossed_boundary,
            },
        );
        self.state = SnapState::Resolving { bubble: id };

        Ok(cell)
    }

    // =========================================================================
    // CLOCK
    // =========================================================================

    /// Advance the board by one tick and run every task that came due.
    ///
    /// A failing task does not stop the rest of the tick; the first error is
    /// returned once everything due has run.
    pub fn tick(&mut self) -> Result<(), PuzzleError> {
        self.scheduler.advance();
        let mut result = Ok(());
        while let Some(task) = self.scheduler.pop_due() {
            if let Err(err) = self.run(task) {
                warn!("Board task failed at tick {}: {err}", self.now());
                result = result.and(Err(err));
            }
        }
        self.grid.advance_settles();
        result
    }

    fn run(&mut self, task: BoardTask) -> Result<(), PuzzleError> {
        match task {
            BoardTask::Pop(id) => {
                // Bubbles removed by a reset are simply gone.
                let Some(bubble) = self.departing.get_mut(&id) else {
                    return Ok(());
                };
                if bubble.pop() {
                    debug!("Popped {id}");
                    self.events.push(PuzzleEvent::BubblePopped { bubble: id });
                    self.scheduler
                        .schedule_in(self.config.timing.pop_anim_ticks, BoardTask::Destroy(id));
                }
            }
            BoardTask::Destroy(id) => {
                if self.departing.remove(&id).is_some() {
                    self.events.push(PuzzleEvent::BubbleDestroyed { bubble: id });
                }
            }
            BoardTask::Publish(outcome) => {
                let popped = outcome.popped;
                self.events.push(PuzzleEvent::BoardResolved(outcome));
                if popped {
                    self.drop_all_floating_bubbles();
                }
            }
            BoardTask::Release { bubble, reload } => {
                self.state = SnapState::Idle;
                self.events.push(PuzzleEvent::SnapSettled { bubble });
                if reload {
                    self.scheduler
                        .schedule_in(self.config.timing.reload_ticks, BoardTask::Reload);
                }
                if let Some(pending) = self.pending.take() {
                    if self.in_flight.contains_key(&pending.bubble) {
                        self.resolve(pending.bubble, pending.position, pending.contact.as_ref())?;
                    }
                }
            }
            BoardTask::Reload => self.reload_launcher(),
        }
        Ok(())
    }

    // =========================================================================
    // HEADLESS FLIGHT
    // =========================================================================

    /// Move in-flight projectiles by `dt` seconds, bounce them off the side
    /// walls and the floor under the launcher, and report contacts with the
    /// grid or the ceiling.
    ///
    /// Hosts that run their own physics call [`Self::on_bubble_contact`]
    /// instead.
    pub fn advance_projectiles(&mut self, dt: f32) -> Result<(), PuzzleError> {
        let layout = *self.grid.layout();
        let radius = layout.tile_width * 0.5;
        let left = layout.origin.x;
        let right = layout.origin.x + layout.width();
        let floor = self.launcher.settings().base.y + radius;
        let mut result = Ok(());

        let mut ids: Vec<BubbleId> = self.in_flight.keys().copied().collect();
        ids.sort();

        for id in ids {
            if self.pending_contact() == Some(id) {
                continue;
            }
            let Some(bubble) = self.in_flight.get_mut(&id) else {
                continue;
            };

            bubble.position += bubble.velocity * dt;
            if bubble.position.x - radius < left {
                bubble.position.x = left + radius;
                bubble.velocity.x = bubble.velocity.x.abs();
            }
            if bubble.position.x + radius > right {
                bubble.position.x = right - radius;
                bubble.velocity.x = -bubble.velocity.x.abs();
            }
            if bubble.position.y + radius > floor {
                bubble.position.y = floor - radius;
                bubble.velocity.y = -bubble.velocity.y.abs();
            }

            let position = bubble.position;
            if let Some(contact) = self.detect_contact(position) {
                if let Err(err) = self.on_bubble_contact(id, position, contact) {
                    warn!("Contact of {id} failed during flight: {err}");
                    result = result.and(Err(err));
                }
            }
        }
        result
    }

    /// `Some(contact)` when a projectile at `position` touches the board:
    /// the nearest grid bubble in reach, or the ceiling with no neighbor.
    fn detect_contact(&self, position: Vec2) -> Option<Option<Contact>> {
        let layout = self.grid.layout();
        let reach = layout.tile_width * CONTACT_DISTANCE;

        let nearest = self
            .grid
            .iter()
            .filter_map(|b| {
                let center = self.grid.coordinate_of(b.cell()?);
                Some((center.distance(position), center, b.id()))
            })
            .filter(|(distance, ..)| *distance <= reach)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((_, center, neighbor)) = nearest {
            let dead_zone = layout.tile_width * CONTACT_DEAD_ZONE;
            let touching = Touching::between(center, position, dead_zone);
            return Some(Some(Contact { neighbor, touching }));
        }

        self.grid.is_anchor_position(position).then_some(None)
    }

    // =========================================================================
    // BODIES
    // =========================================================================

    /// Mirror bubble positions into render bodies and destroy the bodies of
    /// bubbles that no longer exist.
    pub fn sync_bodies<B: BubbleBody>(&self, bodies: &mut HashMap<BubbleId, B>) {
        bodies.retain(|id, body| match self.bubble(*id) {
            Some(bubble) => {
                body.set_position(bubble.position);
                true
            }
            None => {
                body.destroy();
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::config::{RuleConfig, TimingConfig};

    fn board_with(layout: &str, rows: usize) -> PuzzleBoard {
        PuzzleBoard::new(PuzzleConfig {
            level: LevelConfig {
                rows: Some(rows),
                columns: Some(8),
                ..LevelConfig::with_layout(layout)
            },
            seed: Some(5),
            ..PuzzleConfig::default()
        })
    }

    fn run_ticks(board: &mut PuzzleBoard, ticks: usize) {
        for _ in 0..ticks {
            board.tick().unwrap();
        }
    }

    fn outcomes(events: &[PuzzleEvent]) -> Vec<BoardOutcome> {
        events
            .iter()
            .filter_map(|e| match e {
                PuzzleEvent::BoardResolved(outcome) => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_new_board_loads_level_and_launcher() {
        let mut board = PuzzleBoard::new(PuzzleConfig {
            seed: Some(1),
            ..PuzzleConfig::default()
        });
        assert_eq!(board.grid().len(), 38);
        assert!(board.launcher().current().is_some());
        assert!(board.launcher().next().is_some());

        let events = board.drain_events();
        assert!(matches!(
            events[0],
            PuzzleEvent::LevelLoaded {
                rows: 11,
                columns: 8,
                bubbles: 38
            }
        ));
        assert!(matches!(events[1], PuzzleEvent::ProjectileGenerated { .. }));
        assert!(board.drain_events().is_empty());
    }

    #[test]
    fn test_small_group_commits_without_popping() {
        let mut board = board_with("11xxxxxx", 11);
        let id = board.inject_projectile(BubbleColor(2), Vec2::new(200.0, 500.0), Vec2::ZERO);
        let position = board.coordinate_of(RowCol::new(0, 2));

        let outcome = board.on_bubble_contact(id, position, None).unwrap();
        assert_eq!(outcome, ContactOutcome::Snapped(RowCol::new(0, 2)));
        assert_eq!(board.grid().len(), 3);
        assert!(board.is_resolving());

        run_ticks(&mut board, 20);
        assert!(!board.is_resolving());
        let resolved = outcomes(&board.drain_events());
        assert_eq!(resolved, vec![BoardOutcome::default()]);
    }

    #[test]
    fn test_pop_removes_group_immediately_and_destroys_later() {
        let mut board = board_with("11xxxxxx", 11);
        board.drain_events();
        let id = board.inject_projectile(BubbleColor(1), Vec2::new(200.0, 500.0), Vec2::ZERO);
        let position = board.coordinate_of(RowCol::new(0, 2));

        board.on_bubble_contact(id, position, None).unwrap();
        assert!(board.grid().is_empty());

        run_ticks(&mut board, 60);
        let events = board.drain_events();
        let resolved = outcomes(&events);
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].popped);
        assert_eq!(resolved[0].popped_group.len(), 3);
        assert!(resolved[0].board_cleared);

        let destroyed = events
            .iter()
            .filter(|e| matches!(e, PuzzleEvent::BubbleDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 3);
    }

    #[test]
    fn test_outcome_is_published_after_stagger() {
        let mut board = PuzzleBoard::new(PuzzleConfig {
            level: LevelConfig {
                rows: Some(11),
                ..LevelConfig::with_layout("11xxxxxx")
            },
            timing: TimingConfig {
                pop_stagger_ticks: 4,
                settle_ticks: 2,
                ..TimingConfig::default()
            },
            seed: Some(5),
            ..PuzzleConfig::default()
        });
        board.drain_events();
        let id = board.inject_projectile(BubbleColor(1), Vec2::ZERO, Vec2::ZERO);
        board.on_bubble_contact(id, board.coordinate_of(RowCol::new(0, 2)), None).unwrap();

        // Three members at 4 ticks each.
        run_ticks(&mut board, 11);
        assert!(outcomes(&board.drain_events()).is_empty());
        assert!(board.is_resolving());
        run_ticks(&mut board, 1);
        assert_eq!(outcomes(&board.drain_events()).len(), 1);
        assert!(!board.is_resolving());
    }

    #[test]
    fn test_danger_row_snap_crosses_boundary_and_skips_reload() {
        let mut board = PuzzleBoard::new(PuzzleConfig {
            level: LevelConfig {
                rows: Some(4),
                init_rows: Some(0),
                ..LevelConfig::default()
            },
            seed: Some(2),
            ..PuzzleConfig::default()
        });
        let fired = board.launcher().current().unwrap().id();
        let base = board.launcher().settings().base;
        board.begin_aim(base - Vec2::new(0.0, 300.0));
        assert_eq!(board.release_aim(base - Vec2::new(0.0, 300.0)), Some(fired));
        board.drain_events();

        let position = board.coordinate_of(RowCol::new(3, 2));
        board.on_bubble_contact(fired, position, None).unwrap();
        run_ticks(&mut board, 60);

        let events = board.drain_events();
        let resolved = outcomes(&events);
        assert!(resolved[0].crossed_boundary);
        assert!(!resolved[0].popped);
        assert!(!events.iter().any(|e| matches!(e, PuzzleEvent::ProjectileGenerated { .. })));
        assert!(board.launcher().current().is_none());
    }

    #[test]
    fn test_launcher_reloads_after_resolution() {
        let mut board = board_with("1xxxxxxx", 11);
        let base = board.launcher().settings().base;
        let aim = base - Vec2::new(0.0, 400.0);
        board.begin_aim(aim);
        let fired = board.release_aim(aim).unwrap();
        assert!(board.launcher().current().is_none());
        board.drain_events();

        board
            .on_bubble_contact(fired, board.coordinate_of(RowCol::new(0, 5)), None)
            .unwrap();
        run_ticks(&mut board, 40);
        assert!(board.launcher().current().is_some());
        assert!(
            board
                .drain_events()
                .iter()
                .any(|e| matches!(e, PuzzleEvent::ProjectileGenerated { .. }))
        );
    }

    #[test]
    fn test_deferred_contact_resolves_after_release() {
        let mut board = board_with("1xxxxxxx", 11);
        let first = board.inject_projectile(BubbleColor(3), Vec2::ZERO, Vec2::ZERO);
        let second = board.inject_projectile(BubbleColor(4), Vec2::ZERO, Vec2::ZERO);
        let third = board.inject_projectile(BubbleColor(5), Vec2::ZERO, Vec2::ZERO);
        board.drain_events();

        board
            .on_bubble_contact(first, board.coordinate_of(RowCol::new(0, 3)), None)
            .unwrap();
        let outcome = board
            .on_bubble_contact(second, board.coordinate_of(RowCol::new(0, 5)), None)
            .unwrap();
        assert_eq!(outcome, ContactOutcome::Deferred);
        board
            .on_bubble_contact(third, board.coordinate_of(RowCol::new(0, 6)), None)
            .unwrap();
        assert_eq!(board.pending_contact(), Some(third));
        assert_eq!(board.grid().len(), 2);

        let events = board.drain_events();
        assert!(events.contains(&PuzzleEvent::ContactSuperseded { bubble: second }));

        run_ticks(&mut board, 40);
        assert!(board.grid().is_occupied(RowCol::new(0, 6)));
        assert!(!board.grid().is_occupied(RowCol::new(0, 5)));
        assert!(board.projectile(second).is_some());
        assert!(board.pending_contact().is_none());
    }

    #[test]
    fn test_unknown_projectile_is_rejected() {
        let mut board = board_with("1", 11);
        let err = board.on_bubble_contact(BubbleId(999), Vec2::ZERO, None).unwrap_err();
        assert!(matches!(err, PuzzleError::UnknownProjectile(BubbleId(999))));
    }

    #[test]
    fn test_full_board_snap_is_fatal() {
        let mut board = PuzzleBoard::new(PuzzleConfig {
            level: LevelConfig {
                rows: Some(1),
                columns: Some(2),
                layout: Some("12".to_string()),
                ..LevelConfig::default()
            },
            rules: RuleConfig {
                min_group_size: 3,
                ..RuleConfig::default()
            },
            seed: Some(1),
            ..PuzzleConfig::default()
        });
        let id = board.inject_projectile(BubbleColor(1), Vec2::ZERO, Vec2::ZERO);
        let err = board.on_bubble_contact(id, Vec2::new(10.0, 10.0), None).unwrap_err();
        assert!(matches!(err, PuzzleError::SnapTargetOccupied { .. }));
        assert!(board.projectile(id).is_some());
        assert!(!board.is_resolving());
    }

    #[test]
    fn test_single_column_board_still_snaps() {
        let mut board = PuzzleBoard::new(PuzzleConfig {
            level: LevelConfig {
                rows: Some(6),
                columns: Some(1),
                init_rows: Some(0),
                ..LevelConfig::default()
            },
            seed: Some(2),
            ..PuzzleConfig::default()
        });
        assert_eq!(board.grid().columns(), 2);

        let id = board.inject_projectile(BubbleColor(1), Vec2::ZERO, Vec2::ZERO);
        let outcome = board
            .on_bubble_contact(id, Vec2::new(45.0, 135.0), None)
            .unwrap();
        let ContactOutcome::Snapped(cell) = outcome else {
            panic!("expected a snap, got {outcome:?}");
        };
        assert!(board.grid().in_bounds(cell));
        assert_eq!(board.grid().bubble(id).and_then(|b| b.cell()), Some(cell));
        assert!(board.projectile(id).is_none());
    }

    #[test]
    fn test_failed_deferred_snap_does_not_stall_the_tick() {
        let mut board = PuzzleBoard::new(PuzzleConfig {
            level: LevelConfig {
                rows: Some(11),
                columns: Some(8),
                ..LevelConfig::with_layout("1xxxxxxx")
            },
            timing: TimingConfig {
                settle_ticks: 10,
                ..TimingConfig::default()
            },
            seed: Some(5),
            ..PuzzleConfig::default()
        });
        let first = board.inject_projectile(BubbleColor(3), Vec2::ZERO, Vec2::ZERO);
        let second = board.inject_projectile(BubbleColor(4), Vec2::ZERO, Vec2::ZERO);
        let target = board.coordinate_of(RowCol::new(0, 4));

        board.on_bubble_contact(first, target, None).unwrap();
        let outcome = board.on_bubble_contact(second, target, None).unwrap();
        assert_eq!(outcome, ContactOutcome::Deferred);

        run_ticks(&mut board, 9);
        assert!(board.grid().bubble(first).unwrap().is_settling());

        // The queued contact lands on the cell the first projectile took.
        let err = board.tick().unwrap_err();
        assert!(matches!(err, PuzzleError::SnapTargetOccupied { .. }));
        assert!(!board.grid().bubble(first).unwrap().is_settling());
        assert!(board.projectile(second).is_some());
        assert!(!board.is_resolving());
    }

    #[test]
    fn test_headless_flight_snaps_below_neighbor() {
        let mut board = board_with("2222xxxx", 11);
        let start = board.coordinate_of(RowCol::new(4, 2));
        let id = board.inject_projectile(BubbleColor(1), start, Vec2::new(0.0, -600.0));

        for _ in 0..60 {
            board.advance_projectiles(1.0 / 60.0).unwrap();
            if board.projectile(id).is_none() {
                break;
            }
        }
        let cell = board.grid().bubble(id).and_then(|b| b.cell()).unwrap();
        assert_eq!(cell.row, 1);
    }

    #[test]
    fn test_headless_flight_bounces_off_walls() {
        let mut board = board_with("x", 11);
        let id = board.inject_projectile(
            BubbleColor(1),
            Vec2::new(600.0, 900.0),
            Vec2::new(1200.0, 0.0),
        );
        board.advance_projectiles(0.2).unwrap();
        let bubble = board.projectile(id).unwrap();
        assert_eq!(bubble.position.x, 720.0 - 45.0);
        assert!(bubble.velocity.x < 0.0);
    }

    #[test]
    fn test_downward_shot_bounces_off_floor_and_reloads() {
        let mut board = board_with("1xxxxxxx", 11);
        let base = board.launcher().settings().base;
        let aim = base + Vec2::new(0.0, 300.0);
        board.begin_aim(aim);
        let fired = board.release_aim(aim).unwrap();

        board.advance_projectiles(1.0 / 60.0).unwrap();
        let bubble = board.projectile(fired).unwrap();
        assert!(bubble.position.y <= base.y);
        assert!(bubble.velocity.y < 0.0);

        for _ in 0..600 {
            board.advance_projectiles(1.0 / 60.0).unwrap();
            board.tick().unwrap();
        }
        assert_eq!(board.projectiles().count(), 0);
        let cell = board.grid().bubble(fired).and_then(|b| b.cell());
        assert_eq!(cell.map(|c| c.row), Some(0));
        assert!(board.launcher().current().is_some());
    }

    #[test]
    fn test_ceiling_contact_snaps_to_row_zero() {
        let mut board = board_with("xxxxxxxx", 11);
        let id = board.inject_projectile(
            BubbleColor(1),
            Vec2::new(400.0, 100.0),
            Vec2::new(0.0, -600.0),
        );
        board.advance_projectiles(0.1).unwrap();
        assert_eq!(board.grid().bubble(id).and_then(|b| b.cell()), Some(RowCol::new(0, 4)));
    }

    #[test]
    fn test_aim_guide_stops_at_first_bubble() {
        let mut board = board_with("xxx1xxxx", 11);
        board.drain_events();
        // Aim at the bubble in (0, 3), centered at (315, 45).
        let guide = board.aim_guide(Vec2::new(315.0, 0.0), 30.0);
        assert!(!guide.is_empty());
        let last = *guide.last().unwrap();
        assert!(board.grid().bubble_at_position(last).is_none());
        assert!(last.y >= 89.0 && last.y < 130.0);
    }

    #[test]
    fn test_place_bubble_rejects_occupied_cell() {
        let mut board = board_with("1", 11);
        assert!(board.place_bubble(RowCol::new(3, 3), BubbleColor(2)).is_ok());
        assert!(matches!(
            board.place_bubble(RowCol::new(0, 0), BubbleColor(2)),
            Err(PuzzleError::CellOccupied { .. })
        ));
    }

    #[test]
    fn test_reset_discards_pending_work() {
        let mut board = board_with("11xxxxxx", 11);
        let id = board.inject_projectile(BubbleColor(1), Vec2::ZERO, Vec2::ZERO);
        board.on_bubble_contact(id, board.coordinate_of(RowCol::new(0, 2)), None).unwrap();
        board.reset();
        board.drain_events();

        run_ticks(&mut board, 60);
        assert!(!board.is_resolving());
        assert_eq!(board.grid().len(), 2);
        assert!(outcomes(&board.drain_events()).is_empty());
    }

    #[derive(Default)]
    struct TestBody {
        position: Vec2,
        destroyed: bool,
    }

    impl BubbleBody for TestBody {
        fn position(&self) -> Vec2 {
            self.position
        }

        fn set_position(&mut self, position: Vec2) {
            self.position = position;
        }

        fn destroy(&mut self) {
            self.destroyed = true;
        }
    }

    #[test]
    fn test_sync_bodies_follows_and_releases() {
        let mut board = board_with("11xxxxxx", 11);
        let ids: Vec<_> = board.grid().iter().map(|b| b.id()).collect();
        let mut bodies: HashMap<BubbleId, TestBody> =
            ids.iter().map(|id| (*id, TestBody::default())).collect();
        bodies.insert(BubbleId(10_000), TestBody::default());

        board.sync_bodies(&mut bodies);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[&ids[0]].position(), board.coordinate_of(RowCol::new(0, 0)));
    }
}
