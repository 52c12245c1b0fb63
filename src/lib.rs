pub mod camera;
pub mod config;
pub mod error;
pub mod level;
pub mod particle;
pub mod player;
pub mod session;
pub mod shared;
pub mod sound;
pub mod spatial;
pub mod utils;
