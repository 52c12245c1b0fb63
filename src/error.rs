use std::fmt;

use bevy::math::Vec3;

/// Errors produced while loading `Mirrorbound.toml`. These abort startup.
#[derive(Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Read(std::io::Error),
    /// The file is not valid TOML or does not match [`Config`](crate::config::Config).
    Parse(toml::de::Error),
    /// A tuning value is outside the range the simulation can work with.
    OutOfRange {
        /// Dotted path of the field, e.g. `mirror_control_config.movement_damping`.
        name: &'static str,
        value: f32,
        /// Human-readable description of the accepted range.
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(err) => write!(f, "could not read config: {}", err),
            ConfigError::Parse(err) => write!(f, "could not parse config: {}", err),
            ConfigError::OutOfRange {
                name,
                value,
                expected,
            } => write!(f, "{} = {} is out of range (expected {})", name, value, expected),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::OutOfRange { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Read(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Errors produced by transform math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    /// A parent scale has a zero or non-finite component, so local scale cannot be derived.
    DegenerateScale { scale: Vec3 },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::DegenerateScale { scale } => {
                write!(f, "degenerate parent scale {:?}", scale)
            }
        }
    }
}

impl std::error::Error for GeometryError {}
