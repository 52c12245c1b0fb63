use std::path::Path;

use bevy::prelude::KeyCode;
use bevy::prelude::*;
use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_PATH: &str = "Mirrorbound.toml";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        let config = match Config::load(CONFIG_PATH) {
            Ok(Some(config)) => {
                info!("Loaded configuration from {}", CONFIG_PATH);
                config
            }
            Ok(None) => Config::default(),
            Err(err) => panic!("Failed to load {}: {}", CONFIG_PATH, err),
        };
        app.insert_resource(config);
    }
}

#[derive(Deserialize, Resource, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub level_config: LevelConfig,
    pub controls_config: ControlsConfig,
    pub movement_config: MovementConfig,
    pub mirror_control_config: MirrorControlConfig,
}

impl Config {
    /// Reads and validates the config at `path`. A missing file is not an error and yields
    /// `Ok(None)` so the caller can fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Config>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Config::from_toml(&contents).map(Some)
    }

    pub fn from_toml(contents: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let movement = &self.movement_config;
        non_negative("movement_config.speed", movement.speed)?;
        positive("movement_config.max_speed", movement.max_speed)?;
        non_negative("movement_config.jump_impulse", movement.jump_impulse)?;
        non_negative("movement_config.air_drag", movement.air_drag)?;
        non_negative("movement_config.liquid_drag", movement.liquid_drag)?;

        let mirror = &self.mirror_control_config;
        non_negative("mirror_control_config.move_speed", mirror.move_speed)?;
        non_negative("mirror_control_config.rotation_speed", mirror.rotation_speed)?;
        damping("mirror_control_config.movement_damping", mirror.movement_damping)?;
        damping("mirror_control_config.rotation_damping", mirror.rotation_damping)?;
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        name,
        value,
        expected: ">= 0",
    })
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        name,
        value,
        expected: "> 0",
    })
}

// Damping must stay below 1 or the mirror would never come to rest.
fn damping(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        name,
        value,
        expected: "[0, 1)",
    })
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LevelConfig {
    pub level_path: String,
    pub start_level: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        LevelConfig {
            level_path: "levels/mirrorbound.ldtk".into(),
            start_level: 0,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ControlsConfig {
    // Movement
    pub key_up: KeyCode,
    pub key_down: KeyCode,
    pub key_right: KeyCode,
    pub key_left: KeyCode,
    pub key_jump: KeyCode,
    // Mirror
    pub key_mirror_mode: KeyCode,
    pub key_mirror_next: KeyCode,
    pub key_rotate_left: KeyCode,
    pub key_rotate_right: KeyCode,
    pub key_interact: KeyCode,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        ControlsConfig {
            key_up: KeyCode::KeyW,
            key_down: KeyCode::KeyS,
            key_left: KeyCode::KeyA,
            key_right: KeyCode::KeyD,
            key_jump: KeyCode::Space,
            key_mirror_mode: KeyCode::Tab,
            key_mirror_next: KeyCode::KeyF,
            key_rotate_left: KeyCode::KeyQ,
            key_rotate_right: KeyCode::KeyE,
            key_interact: KeyCode::KeyR,
        }
    }
}

/// Tuning for the player body while in direct control.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MovementConfig {
    /// Horizontal force per unit of input.
    pub speed: f32,
    /// Horizontal speed past which no further force is applied in the same direction.
    pub max_speed: f32,
    pub jump_impulse: f32,
    pub air_drag: f32,
    pub liquid_drag: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        MovementConfig {
            speed: 600.0,
            max_speed: 80.0,
            jump_impulse: 90.0,
            air_drag: 0.5,
            liquid_drag: 4.0,
        }
    }
}

/// Tuning for remote mirror control. Speeds are per fixed tick, rotation in radians.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MirrorControlConfig {
    pub move_speed: f32,
    pub rotation_speed: f32,
    pub movement_damping: f32,
    pub rotation_damping: f32,
}

impl Default for MirrorControlConfig {
    fn default() -> Self {
        MirrorControlConfig {
            move_speed: 1.5,
            rotation_speed: 0.04,
            movement_damping: 0.85,
            rotation_damping: 0.8,
        }
    }
}
