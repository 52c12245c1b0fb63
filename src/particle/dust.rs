use std::time::Duration;

use bevy::{prelude::*, time::Stopwatch};
use rand::Rng;

use super::Particle;

/// Particles are drawn in front of the level but behind the player.
const DUST_Z: f32 = 1.;
const DUST_SIZE: f32 = 1.;
/// Horizontal spread of the spawn point around the player's feet.
const DUST_SPREAD: f32 = 4.;

/// What a surface kicks up when the player walks on it.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DustSurface {
    #[default]
    Stone,
    Wood,
}

impl DustSurface {
    fn color(&self) -> Color {
        match self {
            Self::Stone => Color::srgb(0.62, 0.62, 0.66),
            Self::Wood => Color::srgb(0.72, 0.52, 0.32),
        }
    }

    pub fn gravity(&self) -> f32 {
        match self {
            Self::Stone => 200.,
            Self::Wood => 120.,
        }
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_secs_f32(match self {
            Self::Stone => 0.05,
            Self::Wood => 0.06,
        })
    }

    pub fn new_starting_velocity(&self, rng: &mut impl Rng) -> Vec2 {
        let rise = match self {
            Self::Stone => 10.0..40.0,
            Self::Wood => 10.0..30.0,
        };
        Vec2::new(rng.random_range(-20.0..20.0), rng.random_range(rise))
    }

    /// Time for a particle launched at `starting_velocity` to fall back to where it started.
    pub fn life_time(&self, starting_velocity: Vec2) -> Duration {
        Duration::from_secs_f32((2. * starting_velocity.y / self.gravity()).max(0.))
    }
}

/// Sent every fixed tick the player walks on the ground.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DustEvent {
    pub feet: Vec2,
    /// The body the player stands on, if the ground probe found one.
    pub ground: Option<Entity>,
}

#[derive(Resource, Default)]
pub struct DustSpawnStopwatch {
    pub walking: Stopwatch,
}

/// [`System`] that turns [`DustEvent`]s into dust particles, at most one per spawn interval of
/// the surface underfoot.
pub fn spawn_walking_dust(
    mut commands: Commands,
    mut ev_dust: EventReader<DustEvent>,
    q_surfaces: Query<&DustSurface>,
    mut stopwatch: ResMut<DustSpawnStopwatch>,
    time: Res<Time>,
) {
    stopwatch.walking.tick(time.delta());
    let Some(event) = ev_dust.read().last() else {
        return;
    };
    let surface = event
        .ground
        .and_then(|ground| q_surfaces.get(ground).ok())
        .copied()
        .unwrap_or_default();
    if stopwatch.walking.elapsed() < surface.spawn_interval() {
        return;
    }
    stopwatch.walking.reset();

    let mut rng = rand::rng();
    let velocity = surface.new_starting_velocity(&mut rng);
    let position = event.feet + Vec2::X * rng.random_range(-DUST_SPREAD..DUST_SPREAD);
    commands.spawn((
        Particle::new(surface.life_time(velocity), velocity, surface.gravity()),
        Sprite::from_color(surface.color(), Vec2::splat(DUST_SIZE)),
        Transform::from_translation(position.extend(DUST_Z)),
    ));
}
