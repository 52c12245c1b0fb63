use bevy::prelude::*;
use bevy::window::PresentMode;
use bevy::{asset::AssetMetaCheck, diagnostic::LogDiagnosticsPlugin};
use bevy_rapier2d::prelude::*;

use mirrorbound::{
    camera::CameraPlugin, config::ConfigPlugin, level::LevelManagementPlugin,
    particle::ParticlePlugin, player::PlayerManagementPlugin, session::SessionPlugin,
    shared::GameState, sound::SoundPlugin,
};

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(ImagePlugin::default_nearest())
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Mirrorbound".into(),
                        name: Some("mirrorbound".into()),
                        present_mode: PresentMode::AutoNoVsync,
                        canvas: Some("#bevy-container".into()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    //https://github.com/bevyengine/bevy_github_ci_template/issues/48
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
        )
        .insert_resource(ClearColor(Color::srgb(0.07, 0.08, 0.12)))
        .add_plugins(bevy_mod_debugdump::CommandLineArgs)
        .add_plugins(ConfigPlugin)
        .add_plugins(LogDiagnosticsPlugin::default())
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(8.0).in_fixed_schedule())
        .init_state::<GameState>()
        .add_plugins(SessionPlugin)
        .add_plugins(LevelManagementPlugin)
        .add_plugins(PlayerManagementPlugin)
        .add_plugins(SoundPlugin)
        .add_plugins(ParticlePlugin)
        .add_plugins(CameraPlugin)
        .run();
}
