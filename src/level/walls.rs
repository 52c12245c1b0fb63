use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::{particle::dust::DustSurface, shared::GroupLabel};

use super::merge_cells::MergedCell;

/// Marker [`Component`] representing a wall.
#[derive(Default, Component)]
pub struct Wall;

/// Wall [`Bundle`] spawned int by Ldtk.
#[derive(Default, Bundle, LdtkIntCell)]
pub struct WallBundle {
    wall: Wall,
}

impl MergedCell for Wall {
    fn bundle(commands: &mut EntityCommands, center: Vec2, half_extent: Vec2) {
        commands.insert((
            Collider::cuboid(half_extent.x, half_extent.y),
            CollisionGroups::new(GroupLabel::TERRAIN, GroupLabel::ALL),
            RigidBody::Fixed,
            Transform::from_xyz(center.x, center.y, 0.),
            DustSurface::Stone,
        ));
    }
}

/// Marker [`Component`] for a body of water. The player floats slower while overlapping one.
#[derive(Default, Component)]
pub struct Water;

#[derive(Default, Bundle, LdtkIntCell)]
pub struct WaterBundle {
    water: Water,
}

impl MergedCell for Water {
    fn bundle(commands: &mut EntityCommands, center: Vec2, half_extent: Vec2) {
        commands.insert((
            Collider::cuboid(half_extent.x, half_extent.y),
            Sensor,
            CollisionGroups::new(GroupLabel::WATER, GroupLabel::PLAYER_SENSOR),
            Transform::from_xyz(center.x, center.y, 0.),
            Sprite::from_color(Color::srgba(0.2, 0.4, 0.9, 0.45), half_extent * 2.),
        ));
    }
}
