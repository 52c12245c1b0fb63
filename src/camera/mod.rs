use bevy::{prelude::*, render::camera::ScalingMode};
use bevy_rapier2d::plugin::PhysicsSet;

use crate::{level::LevelSystems, player::PlayerMarker};

/// The [`Plugin`] responsible for handling anything Camera related.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera).add_systems(
            FixedUpdate,
            move_camera
                .after(PhysicsSet::Writeback)
                .in_set(LevelSystems::Simulation),
        );
    }
}

/// Marker [`Component`] used to query for the main camera in the world.
#[derive(Component, Default)]
pub struct MainCamera;

pub const CAMERA_WIDTH: f32 = 320.;
pub const CAMERA_HEIGHT: f32 = 180.;
/// Fraction of the remaining distance to the player covered every fixed tick.
pub const CAMERA_EASING: f32 = 0.2;

/// [`Startup`] [`System`] that spawns the [`Camera2d`] in the world.
///
/// Notes:
/// - Spawns the camera with [`OrthographicProjection`] with fixed scaling at 320x180
fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        MainCamera,
        OrthographicProjection {
            scaling_mode: ScalingMode::Fixed {
                width: CAMERA_WIDTH,
                height: CAMERA_HEIGHT,
            },
            ..OrthographicProjection::default_2d()
        },
        Transform::default(),
    ));
}

/// Eases the camera towards the player, keeping its depth.
pub fn move_camera(
    q_player: Query<&GlobalTransform, With<PlayerMarker>>,
    mut q_camera: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(player) = q_player.get_single() else {
        return;
    };
    let Ok(mut camera) = q_camera.get_single_mut() else {
        return;
    };
    let target = camera
        .translation
        .truncate()
        .lerp(player.translation().truncate(), CAMERA_EASING);
    camera.translation = target.extend(camera.translation.z);
}
