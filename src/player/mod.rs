use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::level::{entity::BodyDescriptor, LevelSystems, SimulationStep};

use control::{drive_selected_mirror, handle_control_commands, PlayerController};
use input::{read_keyboard_input, PlayerInput};
use movement::{apply_locomotion, update_contact_flags};
use spawn::init_player_bundle;

pub mod control;
pub mod input;
pub mod movement;
mod spawn;

/// [`Plugin`] for anything player based.
pub struct PlayerManagementPlugin;

impl Plugin for PlayerManagementPlugin {
    fn build(&self, app: &mut App) {
        app.register_ldtk_entity::<LdtkPlayerBundle>("Player")
            .add_systems(
                Update,
                read_keyboard_input.in_set(LevelSystems::Simulation),
            )
            .add_systems(
                FixedUpdate,
                update_contact_flags::<RapierContext>.in_set(SimulationStep::Sense),
            )
            .add_systems(
                FixedUpdate,
                handle_control_commands.in_set(SimulationStep::Command),
            )
            .add_systems(
                FixedUpdate,
                (drive_selected_mirror, apply_locomotion)
                    .chain()
                    .in_set(SimulationStep::Drive),
            );
    }
}

/// [`Component`] to signal our own code to finish the initialization of the player.
#[derive(Component, Default)]
pub struct PlayerMarker;

/// [`Bundle`] that will be initialized with [`init_player_bundle`] and inserted to the player
/// [`Entity`] by Ldtk.
#[derive(Bundle)]
pub struct PlayerBundle {
    body: RigidBody,
    collider: Collider,
    collision_groups: CollisionGroups,
    velocity: Velocity,
    force: ExternalForce,
    impulse: ExternalImpulse,
    damping: Damping,
    locked_axes: LockedAxes,
    sleeping: Sleeping,
    friction: Friction,
    descriptor: BodyDescriptor,
    controller: PlayerController,
    input: PlayerInput,
    sprite: Sprite,
}

/// [`Bundle`] registered with Ldtk that will be spawned in with the level.
#[derive(Bundle, LdtkEntity)]
pub struct LdtkPlayerBundle {
    #[default]
    player_marker: PlayerMarker,
    #[with(init_player_bundle)]
    player: PlayerBundle,
}
