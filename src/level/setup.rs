use crate::config::Config;
use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;

pub struct LevelSetupPlugin;

impl Plugin for LevelSetupPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(LevelSelection::index(0))
            .insert_resource(LdtkSettings {
                level_spawn_behavior: LevelSpawnBehavior::UseZeroTranslation,
                level_background: LevelBackground::Nonexistent,
                ..default()
            })
            .add_systems(Startup, setup_level);
    }
}

pub fn setup_level(
    mut commands: Commands,
    mut level_selection: ResMut<LevelSelection>,
    asset_server: Res<AssetServer>,
    config: Res<Config>,
) {
    info!(
        "Loading {} at level {}",
        config.level_config.level_path, config.level_config.start_level
    );
    *level_selection = LevelSelection::index(config.level_config.start_level);
    commands.spawn(LdtkWorldBundle {
        ldtk_handle: asset_server.load(&config.level_config.level_path).into(),
        ..Default::default()
    });
}
