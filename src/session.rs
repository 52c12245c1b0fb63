use bevy::prelude::*;

use crate::level::{mirror::Mirror, LevelSystems};

/// [`Plugin`] that owns the per-session state shared between the player and the level.
pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<GameSession>() {
            warn!("GameSession is already initialized, keeping the existing one");
        } else {
            app.init_resource::<GameSession>();
        }

        app.add_systems(
            PreUpdate,
            (detach_removed_mirrors, attach_new_mirrors)
                .chain()
                .in_set(LevelSystems::Processing),
        );
    }
}

/// Ordered list of the mirrors that can currently be selected by the player.
#[derive(Debug, Default, Clone)]
pub struct MirrorRegistry {
    mirrors: Vec<Entity>,
}

impl MirrorRegistry {
    /// Appends `mirror`, returning false if it was already registered.
    pub fn register(&mut self, mirror: Entity) -> bool {
        if self.mirrors.contains(&mirror) {
            return false;
        }
        self.mirrors.push(mirror);
        true
    }

    /// Removes `mirror`, returning the index it occupied.
    pub fn unregister(&mut self, mirror: Entity) -> Option<usize> {
        let index = self.index_of(mirror)?;
        self.mirrors.remove(index);
        Some(index)
    }

    pub fn list(&self) -> &[Entity] {
        &self.mirrors
    }

    pub fn get(&self, index: usize) -> Option<Entity> {
        self.mirrors.get(index).copied()
    }

    pub fn index_of(&self, mirror: Entity) -> Option<usize> {
        self.mirrors.iter().position(|entity| *entity == mirror)
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// The index after `index`, wrapping around. `None` if nothing is registered.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        if self.mirrors.is_empty() {
            return None;
        }
        Some((index + 1) % self.mirrors.len())
    }
}

/// [`Resource`] holding everything that lives for the whole play session. Inserted once by
/// [`SessionPlugin`].
#[derive(Resource, Debug, Default)]
pub struct GameSession {
    mirrors: MirrorRegistry,
}

impl GameSession {
    pub fn mirrors(&self) -> &MirrorRegistry {
        &self.mirrors
    }

    /// Makes `mirror` selectable. Called by the entity management systems when a mirror spawns.
    pub fn attach(&mut self, mirror: Entity) {
        if self.mirrors.register(mirror) {
            debug!("Attached mirror {:?}", mirror);
        }
    }

    /// Removes `mirror` from the selection cycle. Called when a mirror despawns.
    pub fn detach(&mut self, mirror: Entity) {
        if self.mirrors.unregister(mirror).is_some() {
            debug!("Detached mirror {:?}", mirror);
        }
    }
}

/// [`System`] that registers freshly spawned [`Mirror`]s. Runs in [`PreUpdate`] so the registry
/// never changes in the middle of a fixed tick.
pub fn attach_new_mirrors(
    q_mirrors: Query<Entity, Added<Mirror>>,
    mut session: ResMut<GameSession>,
) {
    for mirror in q_mirrors.iter() {
        session.attach(mirror);
    }
}

pub fn detach_removed_mirrors(
    mut removed: RemovedComponents<Mirror>,
    mut session: ResMut<GameSession>,
) {
    for mirror in removed.read() {
        session.detach(mirror);
    }
}
