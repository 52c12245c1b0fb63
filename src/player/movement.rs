use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::{
    config::{Config, MovementConfig},
    particle::dust::DustEvent,
    shared::GroupLabel,
    sound::{PlaySfxEvent, SoundEffect},
    spatial::{OverlapZone, SpatialIndex},
};

use super::{
    control::{ControlMode, PlayerController},
    input::PlayerInput,
    PlayerMarker,
};

pub const PLAYER_HALF_WIDTH: f32 = 5.;
pub const PLAYER_HALF_HEIGHT: f32 = 7.;
/// Height of the box below the player's feet that counts as standing on something.
const GROUND_PROBE_HALF_HEIGHT: f32 = 1.;

/// The force to apply along an axis for `input` in `[-1, 1]`. Force that would push past
/// `max_speed` is dropped, force against the current velocity always goes through.
pub fn horizontal_force(input: f32, velocity: f32, speed: f32, max_speed: f32) -> f32 {
    let force = input * speed;
    if force * velocity > 0. && velocity.abs() >= max_speed {
        return 0.;
    }
    force
}

pub fn linear_drag(submerged: bool, movement: &MovementConfig) -> f32 {
    if submerged {
        movement.liquid_drag
    } else {
        movement.air_drag
    }
}

/// Box just below the feet of a player centered at `position`.
pub fn ground_probe(position: Vec2) -> OverlapZone {
    OverlapZone::new(
        position - Vec2::Y * (PLAYER_HALF_HEIGHT + GROUND_PROBE_HALF_HEIGHT),
        0.,
        Vec2::new(PLAYER_HALF_WIDTH - 1., GROUND_PROBE_HALF_HEIGHT),
    )
}

/// [`System`] that re-derives whether the player stands on something and whether it is in water.
pub fn update_contact_flags<S: SpatialIndex + Component>(
    mut q_player: Query<(&mut PlayerController, &GlobalTransform), With<PlayerMarker>>,
    q_index: Query<&S>,
) {
    let Ok((mut controller, transform)) = q_player.get_single_mut() else {
        return;
    };
    let Ok(index) = q_index.get_single() else {
        return;
    };
    let position = transform.translation().truncate();

    let ground_filter = QueryFilter::new().exclude_sensors().groups(CollisionGroups::new(
        GroupLabel::PLAYER_SENSOR,
        GroupLabel::TERRAIN | GroupLabel::BODY | GroupLabel::DUPLICATE,
    ));
    controller.ground = index
        .overlapping(&ground_probe(position), ground_filter)
        .first()
        .copied();
    controller.grounded = controller.ground.is_some();

    let body = OverlapZone::new(
        position,
        0.,
        Vec2::new(PLAYER_HALF_WIDTH, PLAYER_HALF_HEIGHT),
    );
    let water_filter = QueryFilter::new()
        .groups(CollisionGroups::new(GroupLabel::PLAYER_SENSOR, GroupLabel::WATER));
    controller.submerged = index.any_overlapping(&body, water_filter);
}

/// [`System`] that pushes the player around in [`ControlMode::Direct`], kicking up dust while it
/// walks on the ground.
pub fn apply_locomotion(
    mut q_player: Query<
        (
            &PlayerController,
            &mut PlayerInput,
            &Transform,
            &Velocity,
            &mut ExternalForce,
            &mut ExternalImpulse,
            &mut Damping,
        ),
        With<PlayerMarker>,
    >,
    config: Res<Config>,
    mut ev_sfx: EventWriter<PlaySfxEvent>,
    mut ev_dust: EventWriter<DustEvent>,
) {
    let Ok((controller, mut input, transform, velocity, mut force, mut impulse, mut damping)) =
        q_player.get_single_mut()
    else {
        return;
    };
    let movement = &config.movement_config;

    damping.linear_damping = linear_drag(controller.submerged, movement);

    let jump = input.take_jump();
    if controller.control_mode() != ControlMode::Direct {
        force.force = Vec2::ZERO;
        return;
    }

    force.force = Vec2::new(
        horizontal_force(
            input.movement.x,
            velocity.linvel.x,
            movement.speed,
            movement.max_speed,
        ),
        0.,
    );

    if controller.grounded && input.movement.x != 0. {
        ev_dust.send(DustEvent {
            feet: transform.translation.truncate() - Vec2::Y * PLAYER_HALF_HEIGHT,
            ground: controller.ground,
        });
    }

    if jump && controller.grounded {
        impulse.impulse = Vec2::Y * movement.jump_impulse;
        ev_sfx.send(PlaySfxEvent(SoundEffect::Jump));
    }
}

#[cfg(test)]
mod tests {
    use crate::{player::input::InputCommand, session::MirrorRegistry};

    use super::*;

    /// Reports `ground` under any ground probe and a water body whenever `water` is set.
    #[derive(Component, Default)]
    struct Contacts {
        ground: Option<Entity>,
        water: bool,
    }

    impl SpatialIndex for Contacts {
        fn overlapping(&self, _zone: &OverlapZone, filter: QueryFilter<'_>) -> Vec<Entity> {
            let looks_for_water = filter
                .groups
                .is_some_and(|groups| groups.filters.contains(GroupLabel::WATER));
            if looks_for_water {
                return if self.water {
                    vec![Entity::PLACEHOLDER]
                } else {
                    Vec::new()
                };
            }
            self.ground.into_iter().collect()
        }
    }

    fn player_world(controller: PlayerController, input: PlayerInput) -> (World, Entity) {
        let mut world = World::new();
        world.insert_resource(Config::default());
        world.init_resource::<Events<PlaySfxEvent>>();
        world.init_resource::<Events<DustEvent>>();
        let player = world
            .spawn((
                PlayerMarker,
                controller,
                input,
                Transform::from_xyz(0., 7., 0.),
                GlobalTransform::from_xyz(0., 7., 0.),
                Velocity::zero(),
                ExternalForce::default(),
                ExternalImpulse::default(),
                Damping::default(),
            ))
            .id();
        (world, player)
    }

    fn input_with(commands: &[InputCommand]) -> PlayerInput {
        let mut input = PlayerInput::default();
        for command in commands {
            input.apply(*command);
        }
        input
    }

    fn sent<E: Event + Clone>(world: &World) -> Vec<E> {
        world
            .resource::<Events<E>>()
            .iter_current_update_events()
            .cloned()
            .collect()
    }

    #[test]
    fn contact_flags_and_drag_follow_the_index() {
        let (mut world, player) = player_world(PlayerController::default(), PlayerInput::default());
        let floor = world.spawn_empty().id();
        let index = world
            .spawn(Contacts {
                ground: Some(floor),
                water: true,
            })
            .id();
        let sense = world.register_system(update_contact_flags::<Contacts>);
        let locomotion = world.register_system(apply_locomotion);
        let movement = MovementConfig::default();

        world.run_system(sense).unwrap();
        world.run_system(locomotion).unwrap();
        let controller = world.get::<PlayerController>(player).unwrap();
        assert!(controller.grounded);
        assert_eq!(controller.ground, Some(floor));
        assert!(controller.submerged);
        assert_eq!(
            world.get::<Damping>(player).unwrap().linear_damping,
            movement.liquid_drag
        );

        *world.get_mut::<Contacts>(index).unwrap() = Contacts::default();
        world.run_system(sense).unwrap();
        world.run_system(locomotion).unwrap();
        let controller = world.get::<PlayerController>(player).unwrap();
        assert!(!controller.grounded);
        assert_eq!(controller.ground, None);
        assert!(!controller.submerged);
        assert_eq!(
            world.get::<Damping>(player).unwrap().linear_damping,
            movement.air_drag
        );
    }

    #[test]
    fn jump_needs_ground() {
        let (mut world, player) =
            player_world(PlayerController::default(), input_with(&[InputCommand::Jump]));
        let locomotion = world.register_system(apply_locomotion);

        world.run_system(locomotion).unwrap();
        assert_eq!(world.get::<ExternalImpulse>(player).unwrap().impulse, Vec2::ZERO);
        assert!(sent::<PlaySfxEvent>(&world).is_empty());

        let mut entity = world.entity_mut(player);
        entity.get_mut::<PlayerController>().unwrap().grounded = true;
        entity.get_mut::<PlayerInput>().unwrap().apply(InputCommand::Jump);
        world.run_system(locomotion).unwrap();

        let jump_impulse = Config::default().movement_config.jump_impulse;
        assert_eq!(
            world.get::<ExternalImpulse>(player).unwrap().impulse,
            Vec2::Y * jump_impulse
        );
        assert_eq!(
            sent::<PlaySfxEvent>(&world),
            vec![PlaySfxEvent(SoundEffect::Jump)]
        );
    }

    #[test]
    fn mirror_control_freezes_the_player() {
        let mut world = World::new();
        let mut registry = MirrorRegistry::default();
        registry.register(world.spawn_empty().id());
        let mut controller = PlayerController::default();
        controller.toggle_mode(&registry);
        controller.grounded = true;
        assert_eq!(controller.control_mode(), ControlMode::MirrorRemote);

        let (mut world, player) = player_world(
            controller,
            input_with(&[
                InputCommand::Movement(Some(Vec2::X)),
                InputCommand::Jump,
            ]),
        );
        world.get_mut::<ExternalForce>(player).unwrap().force = Vec2::new(50., 0.);
        let locomotion = world.register_system(apply_locomotion);
        world.run_system(locomotion).unwrap();

        assert_eq!(world.get::<ExternalForce>(player).unwrap().force, Vec2::ZERO);
        assert_eq!(world.get::<ExternalImpulse>(player).unwrap().impulse, Vec2::ZERO);
        assert!(!world.get_mut::<PlayerInput>(player).unwrap().take_jump());
        assert!(sent::<PlaySfxEvent>(&world).is_empty());
        assert!(sent::<DustEvent>(&world).is_empty());
    }

    #[test]
    fn walking_on_the_ground_kicks_up_dust() {
        let floor = Entity::from_raw(42);
        let mut controller = PlayerController::default();
        controller.grounded = true;
        controller.ground = Some(floor);
        let (mut world, player) = player_world(
            controller,
            input_with(&[InputCommand::Movement(Some(Vec2::new(-1., 0.)))]),
        );
        let locomotion = world.register_system(apply_locomotion);

        world.run_system(locomotion).unwrap();
        assert_eq!(
            sent::<DustEvent>(&world),
            vec![DustEvent {
                feet: Vec2::ZERO,
                ground: Some(floor),
            }]
        );
        assert!(world.get::<ExternalForce>(player).unwrap().force.x < 0.);

        // standing still or airborne leaves no dust
        world
            .get_mut::<PlayerInput>(player)
            .unwrap()
            .apply(InputCommand::Movement(None));
        world.run_system(locomotion).unwrap();
        let mut entity = world.entity_mut(player);
        entity
            .get_mut::<PlayerInput>()
            .unwrap()
            .apply(InputCommand::Movement(Some(Vec2::X)));
        entity.get_mut::<PlayerController>().unwrap().grounded = false;
        world.run_system(locomotion).unwrap();
        assert_eq!(sent::<DustEvent>(&world).len(), 1);
    }

    #[test]
    fn force_stops_at_max_speed() {
        assert_eq!(horizontal_force(1., 0., 600., 80.), 600.);
        assert_eq!(horizontal_force(1., 79., 600., 80.), 600.);
        assert_eq!(horizontal_force(1., 80., 600., 80.), 0.);
        assert_eq!(horizontal_force(-1., -100., 600., 80.), 0.);
    }

    #[test]
    fn opposing_force_always_applies() {
        assert_eq!(horizontal_force(-1., 120., 600., 80.), -600.);
        assert_eq!(horizontal_force(1., -120., 600., 80.), 600.);
        assert_eq!(horizontal_force(0., 120., 600., 80.), 0.);
    }

    #[test]
    fn water_is_draggier_than_air() {
        let movement = MovementConfig::default();
        assert_eq!(linear_drag(false, &movement), movement.air_drag);
        assert_eq!(linear_drag(true, &movement), movement.liquid_drag);
    }

    #[test]
    fn ground_probe_sits_under_the_feet() {
        let probe = ground_probe(Vec2::new(10., 20.));
        let top = probe.center.y + probe.half_extents.y;
        assert_eq!(top, 20. - PLAYER_HALF_HEIGHT);
        assert!(probe.half_extents.x < PLAYER_HALF_WIDTH);
    }
}
