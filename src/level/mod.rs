use bevy::prelude::*;
use bevy_ecs_ldtk::{prelude::*, systems::process_ldtk_levels};
use bevy_rapier2d::plugin::PhysicsSet;

use crate::shared::GameState;
use entity::{CrateBundle, GateBundle};
use merge_cells::spawn_merged_cells;
use mirror::MirrorPlugin;
use setup::LevelSetupPlugin;
use transition::LevelTransitionPlugin;
use walls::{Wall, WallBundle, Water, WaterBundle};

pub mod entity;
pub mod merge_cells;
pub mod mirror;
mod setup;
pub mod transition;
pub mod walls;

/// [`Plugin`] that handles everything related to the level.
pub struct LevelManagementPlugin;

impl Plugin for LevelManagementPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(LdtkPlugin)
            .add_plugins(LevelSetupPlugin)
            .add_plugins(MirrorPlugin)
            .add_plugins(LevelTransitionPlugin)
            .register_ldtk_entity::<CrateBundle>("Crate")
            .register_ldtk_entity::<GateBundle>("Gate")
            .register_ldtk_int_cell_for_layer::<WallBundle>("Terrain", 1)
            .register_ldtk_int_cell_for_layer::<WaterBundle>("Terrain", 2)
            .add_systems(
                PreUpdate,
                (spawn_merged_cells::<Wall>, spawn_merged_cells::<Water>)
                    .in_set(LevelSystems::Processing),
            )
            .configure_sets(
                PreUpdate,
                LevelSystems::Processing.after(process_ldtk_levels),
            )
            .configure_sets(
                Update,
                LevelSystems::Simulation.run_if(in_state(GameState::Playing)),
            )
            .configure_sets(
                FixedUpdate,
                LevelSystems::Simulation.run_if(in_state(GameState::Playing)),
            )
            .configure_sets(
                FixedUpdate,
                (
                    SimulationStep::Sense,
                    SimulationStep::Command,
                    SimulationStep::Mirror,
                    SimulationStep::Drive,
                )
                    .chain()
                    .in_set(LevelSystems::Simulation)
                    .before(PhysicsSet::SyncBackend),
            );
    }
}

/// [`SystemSet`] used to distinguish different types of systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LevelSystems {
    /// Systems used to simulate game logic in [`Update`] and [`FixedUpdate`]
    Simulation,
    /// Systems used to process Ldtk Entities after they spawn in [`PreUpdate`]
    Processing,
}

/// The fixed order in which one simulation tick is applied.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationStep {
    /// Poll overlap queries (ground, liquid).
    Sense,
    /// Turn latched player input into mode changes and mirror events.
    Command,
    /// Mirrors react to activation and duplication events.
    Mirror,
    /// Apply movement: mirror commands and player locomotion.
    Drive,
}
