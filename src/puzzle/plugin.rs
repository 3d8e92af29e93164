//! Bevy adapter for the puzzle board.
//!
//! The board lives in the [`Puzzle`] resource. Physics reports contacts as
//! [`BubbleContact`] messages; everything the board publishes comes back out
//! as [`PuzzleMessage`]s for scoring, UI and rendering systems to read.

use bevy::prelude::*;

use super::{
    board::PuzzleBoard,
    bubble::BubbleId,
    config::PuzzleConfig,
    events::PuzzleEvent,
    snap::Contact,
};

/// Adds the puzzle board and its systems.
#[derive(Debug, Clone, Default)]
pub struct PuzzlePlugin {
    pub config: PuzzleConfig,
    /// Let the board move projectiles itself instead of relying on the
    /// host's physics.
    pub headless_flight: bool,
}

impl Plugin for PuzzlePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Puzzle(PuzzleBoard::new(self.config.clone())));
        app.add_message::<BubbleContact>();
        app.add_message::<PuzzleMessage>();

        app.add_systems(
            Update,
            (apply_contacts, forward_events)
                .chain()
                .in_set(PuzzleSystems),
        );
        app.add_systems(FixedUpdate, tick_board.in_set(PuzzleSystems));

        if self.headless_flight {
            app.add_systems(
                FixedUpdate,
                fly_projectiles.before(tick_board).in_set(PuzzleSystems),
            );
        }
    }
}

/// System set for puzzle systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PuzzleSystems;

/// The board as a Bevy resource.
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct Puzzle(pub PuzzleBoard);

/// Message sent by physics when an in-flight projectile touches the board.
#[derive(Message, Debug, Clone, Copy)]
pub struct BubbleContact {
    pub bubble: BubbleId,
    pub position: Vec2,
    /// The grid bubble that was hit, if any.
    pub contact: Option<Contact>,
}

/// Message carrying one board event.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct PuzzleMessage(pub PuzzleEvent);

fn apply_contacts(mut contacts: MessageReader<BubbleContact>, mut puzzle: ResMut<Puzzle>) {
    for event in contacts.read() {
        if let Err(err) = puzzle.on_bubble_contact(event.bubble, event.position, event.contact) {
            error!("Contact of {} could not be resolved: {err}", event.bubble);
        }
    }
}

fn tick_board(mut puzzle: ResMut<Puzzle>) {
    if let Err(err) = puzzle.tick() {
        error!("Puzzle tick failed: {err}");
    }
}

fn fly_projectiles(time: Res<Time>, mut puzzle: ResMut<Puzzle>) {
    if let Err(err) = puzzle.advance_projectiles(time.delta_secs()) {
        error!("Projectile flight failed: {err}");
    }
}

fn forward_events(mut puzzle: ResMut<Puzzle>, mut messages: MessageWriter<PuzzleMessage>) {
    for event in puzzle.drain_events() {
        messages.write(PuzzleMessage(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::message::Messages;
    use crate::puzzle::{
        bubble::BubbleColor,
        config::LevelConfig,
        hex::RowCol,
    };

    #[derive(Resource, Default)]
    struct Received(Vec<PuzzleEvent>);

    fn collect(mut messages: MessageReader<PuzzleMessage>, mut received: ResMut<Received>) {
        received.0.extend(messages.read().map(|m| m.0.clone()));
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(PuzzlePlugin {
            config: PuzzleConfig {
                level: LevelConfig {
                    rows: Some(11),
                    ..LevelConfig::with_layout("11xxxxxx")
                },
                seed: Some(4),
                ..PuzzleConfig::default()
            },
            headless_flight: false,
        });
        app.init_resource::<Received>();
        app.add_systems(Update, collect.after(PuzzleSystems));
        app
    }

    #[test]
    fn test_plugin_publishes_level_events() {
        let mut app = test_app();
        app.update();

        let received = &app.world().resource::<Received>().0;
        assert!(matches!(received[0], PuzzleEvent::LevelLoaded { bubbles: 2, .. }));
    }

    #[test]
    fn test_contact_message_snaps_projectile() {
        let mut app = test_app();
        app.update();

        let (id, position) = {
            let mut puzzle = app.world_mut().resource_mut::<Puzzle>();
            let position = puzzle.coordinate_of(RowCol::new(0, 5));
            (puzzle.inject_projectile(BubbleColor(2), position, Vec2::ZERO), position)
        };
        app.world_mut()
            .resource_mut::<Messages<BubbleContact>>()
            .write(BubbleContact {
                bubble: id,
                position,
                contact: None,
            });
        app.update();

        let puzzle = app.world().resource::<Puzzle>();
        assert!(puzzle.grid().is_occupied(RowCol::new(0, 5)));
        assert!(puzzle.is_resolving());

        let received = &app.world().resource::<Received>().0;
        assert!(received.contains(&PuzzleEvent::BubbleSnapped {
            bubble: id,
            cell: RowCol::new(0, 5),
        }));
    }
}
