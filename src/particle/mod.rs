use std::time::Duration;

use bevy::prelude::*;

use dust::{spawn_walking_dust, DustEvent, DustSpawnStopwatch};

pub mod dust;

pub struct ParticlePlugin;

impl Plugin for ParticlePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DustEvent>()
            .init_resource::<DustSpawnStopwatch>()
            .add_systems(
                Update,
                (spawn_walking_dust, update_particles, delete_particles).chain(),
            );
    }
}

/// A short-lived sprite that flies off and falls under its own gravity.
#[derive(Component, Debug, Clone)]
#[require(Transform)]
pub struct Particle {
    timer: Timer,
    velocity: Vec2,
    gravity: f32,
}

impl Particle {
    pub fn new(life_time: Duration, velocity: Vec2, gravity: f32) -> Self {
        Self {
            timer: Timer::new(life_time, TimerMode::Once),
            velocity,
            gravity,
        }
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_finished(&self) -> bool {
        self.timer.finished()
    }
}

pub fn update_particles(mut particles: Query<(&mut Transform, &mut Particle)>, time: Res<Time>) {
    let delta = time.delta_secs();
    for (mut transform, mut particle) in particles.iter_mut() {
        particle.timer.tick(time.delta());
        particle.velocity.y -= particle.gravity * delta;
        transform.translation += (particle.velocity * delta).extend(0.);
    }
}

pub fn delete_particles(mut commands: Commands, particles: Query<(Entity, &Particle)>) {
    for (entity, particle) in particles.iter() {
        if particle.is_finished() {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particles_fall_and_expire() {
        let mut world = World::new();
        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_millis(100));
        world.insert_resource(time);

        let particle = world
            .spawn(Particle::new(
                Duration::from_millis(250),
                Vec2::new(10., 20.),
                100.,
            ))
            .id();
        let update = world.register_system(update_particles);
        let delete = world.register_system(delete_particles);

        world.run_system(update).unwrap();
        world.run_system(delete).unwrap();
        let velocity = world.get::<Particle>(particle).unwrap().velocity();
        assert!(velocity.abs_diff_eq(Vec2::new(10., 10.), 1e-4));
        let translation = world.get::<Transform>(particle).unwrap().translation;
        assert!(translation.abs_diff_eq(Vec3::new(1., 1., 0.), 1e-4));

        for _ in 0..2 {
            world.run_system(update).unwrap();
            world.run_system(delete).unwrap();
        }
        assert!(!world.entities().contains(particle));
    }
}
