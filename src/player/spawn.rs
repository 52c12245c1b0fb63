use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::{level::entity::BodyDescriptor, shared::GroupLabel};

use super::{
    control::PlayerController,
    input::PlayerInput,
    movement::{PLAYER_HALF_HEIGHT, PLAYER_HALF_WIDTH},
    PlayerBundle,
};

/// Used by Ldtk to spawn the player correctly with all of the correct [`Component`]s.
pub fn init_player_bundle(_: &EntityInstance) -> PlayerBundle {
    PlayerBundle {
        body: RigidBody::Dynamic,
        collider: Collider::cuboid(PLAYER_HALF_WIDTH, PLAYER_HALF_HEIGHT),
        collision_groups: CollisionGroups::new(
            GroupLabel::PLAYER_COLLIDER,
            GroupLabel::TERRAIN | GroupLabel::BODY | GroupLabel::DUPLICATE | GroupLabel::TRIGGER,
        ),
        velocity: Velocity::zero(),
        force: ExternalForce::default(),
        impulse: ExternalImpulse::default(),
        damping: Damping::default(),
        locked_axes: LockedAxes::ROTATION_LOCKED,
        sleeping: Sleeping::disabled(),
        friction: Friction {
            coefficient: 0.,
            combine_rule: CoefficientCombineRule::Min,
        },
        // the player pushes crates around but is never copied itself
        descriptor: BodyDescriptor { duplicable: false },
        controller: PlayerController::default(),
        input: PlayerInput::default(),
        sprite: Sprite::from_color(
            Color::srgb(0.95, 0.85, 0.55),
            Vec2::new(PLAYER_HALF_WIDTH, PLAYER_HALF_HEIGHT) * 2.,
        ),
    }
}
