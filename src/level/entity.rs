use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::{particle::dust::DustSurface, shared::GroupLabel};

/// Capability flags of a physics body, set when it is constructed.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyDescriptor {
    /// Whether a duplicating mirror may clone this body.
    pub duplicable: bool,
}

impl Default for BodyDescriptor {
    fn default() -> Self {
        Self { duplicable: true }
    }
}

impl From<&EntityInstance> for BodyDescriptor {
    fn from(entity_instance: &EntityInstance) -> Self {
        Self {
            duplicable: entity_instance
                .get_bool_field("duplicable")
                .copied()
                .unwrap_or(true),
        }
    }
}

/// Marks a level object that only exists while the mirror with the same id is activated.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkedObject {
    pub mirror_id: i32,
}

impl From<&EntityInstance> for LinkedObject {
    fn from(entity_instance: &EntityInstance) -> Self {
        Self {
            mirror_id: entity_instance
                .get_int_field("mirror_id")
                .copied()
                .unwrap_or_default(),
        }
    }
}

/// [`Bundle`] used to group together components commonly used together when initializing physics
/// for fixed [`LdtkEntity`]s.
#[derive(Default, Bundle)]
pub struct FixedEntityBundle {
    pub collider: Collider,
    pub rigid_body: RigidBody,
    pub collision_groups: CollisionGroups,
}

impl From<&EntityInstance> for FixedEntityBundle {
    fn from(entity_instance: &EntityInstance) -> Self {
        let half_extents = instance_half_extents(entity_instance);
        let collision_groups = match entity_instance.identifier.as_ref() {
            "Gate" => CollisionGroups::new(GroupLabel::TERRAIN, GroupLabel::ALL),
            "LevelSwitch" => {
                CollisionGroups::new(GroupLabel::TRIGGER, GroupLabel::PLAYER_COLLIDER)
            }
            other => {
                warn!("{} has no collision setup, treating it as terrain", other);
                CollisionGroups::new(GroupLabel::TERRAIN, GroupLabel::ALL)
            }
        };
        FixedEntityBundle {
            collider: Collider::cuboid(half_extents.x, half_extents.y),
            rigid_body: RigidBody::Fixed,
            collision_groups,
        }
    }
}

/// [`Bundle`] for loose physics objects the player can push around and mirrors can duplicate.
#[derive(Bundle)]
pub struct DynamicBodyBundle {
    pub collider: Collider,
    pub rigid_body: RigidBody,
    pub collision_groups: CollisionGroups,
    pub velocity: Velocity,
    pub friction: Friction,
}

impl From<&EntityInstance> for DynamicBodyBundle {
    fn from(entity_instance: &EntityInstance) -> Self {
        let half_extents = instance_half_extents(entity_instance);
        DynamicBodyBundle {
            collider: Collider::cuboid(half_extents.x, half_extents.y),
            rigid_body: RigidBody::Dynamic,
            collision_groups: CollisionGroups::new(GroupLabel::BODY, GroupLabel::ALL),
            velocity: Velocity::zero(),
            friction: Friction::coefficient(0.8),
        }
    }
}

#[derive(Bundle, LdtkEntity)]
pub struct CrateBundle {
    #[from_entity_instance]
    body: DynamicBodyBundle,
    #[from_entity_instance]
    descriptor: BodyDescriptor,
    #[with(crate_sprite)]
    sprite: Sprite,
    #[with(crate_dust)]
    dust_surface: DustSurface,
}

fn crate_dust(_: &EntityInstance) -> DustSurface {
    DustSurface::Wood
}

fn crate_sprite(entity_instance: &EntityInstance) -> Sprite {
    Sprite::from_color(
        Color::srgb(0.62, 0.42, 0.24),
        instance_half_extents(entity_instance) * 2.,
    )
}

/// Gates block the way while their mirror is activated.
#[derive(Bundle, LdtkEntity)]
pub struct GateBundle {
    #[from_entity_instance]
    fixed_entity_bundle: FixedEntityBundle,
    #[from_entity_instance]
    linked: LinkedObject,
    #[with(gate_sprite)]
    sprite: Sprite,
}

fn gate_sprite(entity_instance: &EntityInstance) -> Sprite {
    Sprite::from_color(
        Color::srgb(0.55, 0.75, 0.95),
        instance_half_extents(entity_instance) * 2.,
    )
}

/// Half of the width and height an entity was given in the level editor.
pub fn instance_half_extents(entity_instance: &EntityInstance) -> Vec2 {
    Vec2::new(
        entity_instance.width as f32 / 2.,
        entity_instance.height as f32 / 2.,
    )
}
