use std::f32::consts::{PI, TAU};

use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::{
    shared::GroupLabel,
    sound::{PlaySfxEvent, SoundEffect},
    spatial::z_angle,
    utils::reparent::{compose_transform_chain, validate_parent_scale},
};

use super::{entity::LinkedObject, LevelSystems, SimulationStep};

pub mod duplicate;

use duplicate::{handle_toggle_mirror_mode, spawn_zone_effect};

/// Thickness of the visible mirror surface.
const MIRROR_HALF_THICKNESS: f32 = 1.;

pub struct MirrorPlugin;

impl Plugin for MirrorPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ToggleMirrorModeEvent>()
            .add_event::<SetMirrorActivationEvent>()
            .register_ldtk_entity::<MirrorBundle>("Mirror")
            .add_systems(
                PreUpdate,
                (init_mirrors, link_objects)
                    .chain()
                    .in_set(LevelSystems::Processing),
            )
            .add_systems(
                FixedUpdate,
                (
                    apply_mirror_activation,
                    handle_toggle_mirror_mode::<RapierContext>,
                )
                    .chain()
                    .in_set(SimulationStep::Mirror),
            );
    }
}

/// Requests a [`Mirror`] to flip between scanning and duplicating.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleMirrorModeEvent(pub Entity);

/// Requests a [`Mirror`] to change its activation state.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMirrorActivationEvent {
    pub mirror: Entity,
    pub active: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DuplicationState {
    #[default]
    Scanning,
    Duplicating,
}

/// What the caller has to apply after [`Mirror::set_activation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationEffects {
    /// New visibility of every object in [`ActivationEffects::objects`].
    pub active: bool,
    pub objects: Vec<Entity>,
    /// Only present when the activation actually changed.
    pub cue: Option<SoundEffect>,
}

/// A movable, rotatable zone that can clone the bodies inside it.
///
/// Starts out [`DuplicationState::Scanning`]. Toggling it captures every duplicable body
/// overlapping its scan zone and parents ghost clones under a [`DuplicateAnchor`], which rotates
/// together with the mirror. See [`duplicate`] for the capture itself.
#[derive(Component, Debug, Clone)]
pub struct Mirror {
    id: i32,
    can_move: bool,
    max_angle: f32,
    scan_half_extents: Vec2,
    state: DuplicationState,
    activated: bool,
    reference_angle: f32,
    linked_objects: Vec<Entity>,
    pub(crate) anchor: Option<Entity>,
    pub(crate) cloned: Vec<Entity>,
    pub(crate) scan_zone: Option<Entity>,
    pub(crate) duplicate_zone: Option<Entity>,
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            id: 0,
            can_move: true,
            max_angle: PI / 4.,
            scan_half_extents: Vec2::splat(16.),
            state: DuplicationState::Scanning,
            activated: false,
            reference_angle: 0.,
            linked_objects: Vec::new(),
            anchor: None,
            cloned: Vec::new(),
            scan_zone: None,
            duplicate_zone: None,
        }
    }
}

impl From<&EntityInstance> for Mirror {
    fn from(entity_instance: &EntityInstance) -> Self {
        let max_angle_degrees = entity_instance
            .get_float_field("max_angle")
            .copied()
            .unwrap_or(45.);
        Mirror::default()
            .with_id(
                entity_instance
                    .get_int_field("id")
                    .copied()
                    .unwrap_or_default(),
            )
            .with_can_move(
                entity_instance
                    .get_bool_field("can_move")
                    .copied()
                    .unwrap_or(true),
            )
            .with_max_angle(max_angle_degrees.to_radians())
            .with_scan_half_extents(super::entity::instance_half_extents(entity_instance))
    }
}

impl Mirror {
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }

    pub fn with_can_move(mut self, can_move: bool) -> Self {
        self.can_move = can_move;
        self
    }

    /// Maximum deviation from the reference orientation while duplicating, clamped to `[0, PI]`.
    pub fn with_max_angle(mut self, max_angle: f32) -> Self {
        self.max_angle = if max_angle.is_nan() {
            0.
        } else {
            max_angle.clamp(0., PI)
        };
        self
    }

    pub fn with_scan_half_extents(mut self, half_extents: Vec2) -> Self {
        self.scan_half_extents = half_extents;
        self
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn can_move(&self) -> bool {
        self.can_move
    }

    pub fn max_angle(&self) -> f32 {
        self.max_angle
    }

    pub fn scan_half_extents(&self) -> Vec2 {
        self.scan_half_extents
    }

    pub fn state(&self) -> DuplicationState {
        self.state
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    pub fn linked_objects(&self) -> &[Entity] {
        &self.linked_objects
    }

    pub fn anchor(&self) -> Option<Entity> {
        self.anchor
    }

    pub fn cloned(&self) -> &[Entity] {
        &self.cloned
    }

    pub fn scan_zone(&self) -> Option<Entity> {
        self.scan_zone
    }

    pub fn duplicate_zone(&self) -> Option<Entity> {
        self.duplicate_zone
    }

    /// Moves the mirror by `delta`. Ignored while duplicating or if the mirror is fixed in place.
    pub fn translate(&self, transform: &mut Transform, delta: Vec2) -> bool {
        if !self.can_move || self.state == DuplicationState::Duplicating {
            return false;
        }
        transform.translation += delta.extend(0.);
        true
    }

    /// Rotates the mirror and its anchor by `angle_delta` (counter-clockwise).
    ///
    /// While duplicating, the anchor may not deviate from the reference orientation by more than
    /// `max_angle`: the rotation is applied first and the overshoot is rotated back afterwards.
    /// While scanning, the reference follows the mirror.
    pub fn rotate(
        &mut self,
        transform: &mut Transform,
        mut anchor: Option<&mut Transform>,
        angle_delta: f32,
    ) {
        let before = z_angle(anchor.as_deref().map_or(transform.rotation, |a| a.rotation));

        transform.rotate_z(angle_delta);
        if let Some(anchor) = anchor.as_deref_mut() {
            anchor.rotate_z(angle_delta);
        }

        match self.state {
            DuplicationState::Scanning => {
                self.reference_angle = z_angle(transform.rotation);
            }
            DuplicationState::Duplicating => {
                let deviation = wrap_angle(before - self.reference_angle) + angle_delta;
                let excess = deviation.abs() - self.max_angle;
                if excess > 0. {
                    let correction = -excess * deviation.signum();
                    transform.rotate_z(correction);
                    if let Some(anchor) = anchor {
                        anchor.rotate_z(correction);
                    }
                }
            }
        }
    }

    /// Sets the activation state and describes what has to change in the world because of it.
    pub fn set_activation(&mut self, active: bool) -> ActivationEffects {
        let changed = self.activated != active;
        self.activated = active;
        ActivationEffects {
            active,
            objects: self.linked_objects.clone(),
            cue: changed.then_some(if active {
                SoundEffect::MirrorActivated
            } else {
                SoundEffect::MirrorDeactivated
            }),
        }
    }

    pub fn link(&mut self, object: Entity) {
        if !self.linked_objects.contains(&object) {
            self.linked_objects.push(object);
        }
    }

    /// Enters [`DuplicationState::Duplicating`] with `orientation` as the clamp reference.
    /// Returns false if the mirror was already duplicating.
    pub fn start_duplicating(&mut self, orientation: f32) -> bool {
        if self.state == DuplicationState::Duplicating {
            return false;
        }
        self.state = DuplicationState::Duplicating;
        self.reference_angle = orientation;
        true
    }

    /// Returns to [`DuplicationState::Scanning`], handing back the clones the caller has to
    /// despawn. `None` if the mirror was not duplicating.
    pub fn stop_duplicating(&mut self) -> Option<Vec<Entity>> {
        if self.state == DuplicationState::Scanning {
            return None;
        }
        self.state = DuplicationState::Scanning;
        Some(std::mem::take(&mut self.cloned))
    }
}

/// Wraps `angle` into `[-PI, PI)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Pivot that clones of a duplicating mirror are parented to. Lives next to the mirror, not
/// under it, so moving the mirror does not drag the clones along.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateAnchor {
    pub mirror: Entity,
}

/// Translucent visual marking the area a mirror scans or duplicates into.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneEffect {
    Scan,
    Duplicate,
}

#[derive(Bundle, LdtkEntity)]
pub struct MirrorBundle {
    #[from_entity_instance]
    mirror: Mirror,
    #[with(mirror_sprite)]
    sprite: Sprite,
    #[with(mirror_collider)]
    collider: Collider,
    #[with(mirror_rigid_body)]
    rigid_body: RigidBody,
    #[with(mirror_collision_groups)]
    collision_groups: CollisionGroups,
    #[default]
    sensor: Sensor,
}

fn mirror_sprite(entity_instance: &EntityInstance) -> Sprite {
    Sprite::from_color(
        Color::srgb(0.85, 0.92, 1.0),
        Vec2::new(entity_instance.width as f32, MIRROR_HALF_THICKNESS * 2.),
    )
}

fn mirror_collider(entity_instance: &EntityInstance) -> Collider {
    Collider::cuboid(entity_instance.width as f32 / 2., MIRROR_HALF_THICKNESS)
}

fn mirror_rigid_body(_: &EntityInstance) -> RigidBody {
    RigidBody::KinematicPositionBased
}

fn mirror_collision_groups(_: &EntityInstance) -> CollisionGroups {
    CollisionGroups::new(GroupLabel::MIRROR, GroupLabel::PLAYER_SENSOR)
}

/// [`System`] that gives every new [`Mirror`] its anchor and its scan zone.
pub fn init_mirrors(
    mut commands: Commands,
    mut q_mirrors: Query<(Entity, &mut Mirror, &Transform, Option<&Parent>), Added<Mirror>>,
    q_hierarchy: Query<(&Transform, Option<&Parent>)>,
) {
    for (entity, mut mirror, transform, parent) in q_mirrors.iter_mut() {
        mirror.scan_zone = Some(spawn_zone_effect(
            &mut commands,
            ZoneEffect::Scan,
            Some(entity),
            Transform::IDENTITY,
            mirror.scan_half_extents(),
        ));
        mirror.reference_angle = z_angle(transform.rotation);

        // the anchor shares the mirror's parent, and clones are reparented under the anchor
        let parent_scale = parent
            .and_then(|parent| {
                compose_transform_chain(parent.get(), |node| {
                    let (transform, parent) = q_hierarchy.get(node).ok()?;
                    Some((*transform, parent.map(Parent::get)))
                })
            })
            .map_or(Vec3::ONE, |parent_world| parent_world.to_scale_rotation_translation().0);
        if let Err(err) = validate_parent_scale(parent_scale) {
            error!("Mirror {:?} cannot duplicate: {}", entity, err);
            continue;
        }

        let mut anchor = commands.spawn((
            DuplicateAnchor { mirror: entity },
            Transform::from_translation(transform.translation).with_rotation(transform.rotation),
            Visibility::default(),
        ));
        if let Some(parent) = parent {
            anchor.set_parent(parent.get());
        }
        mirror.anchor = Some(anchor.id());
        debug!("Initialized mirror {} ({:?})", mirror.id(), entity);
    }
}

/// [`System`] that hands new [`LinkedObject`]s to the mirror with the matching id and syncs their
/// visibility with it.
pub fn link_objects(
    mut commands: Commands,
    q_objects: Query<(Entity, &LinkedObject), Added<LinkedObject>>,
    mut q_mirrors: Query<&mut Mirror>,
) {
    for (entity, linked) in q_objects.iter() {
        let Some(mut mirror) = q_mirrors
            .iter_mut()
            .find(|mirror| mirror.id() == linked.mirror_id)
        else {
            warn!("No mirror with id {} for {:?}", linked.mirror_id, entity);
            continue;
        };
        mirror.link(entity);
        set_object_active(&mut commands, entity, mirror.is_activated());
    }
}

fn set_object_active(commands: &mut Commands, object: Entity, active: bool) {
    let Some(mut object) = commands.get_entity(object) else {
        return;
    };
    if active {
        object.insert(Visibility::Inherited).remove::<ColliderDisabled>();
    } else {
        object.insert((Visibility::Hidden, ColliderDisabled));
    }
}

/// [`System`] that applies [`SetMirrorActivationEvent`]s and their side effects.
pub fn apply_mirror_activation(
    mut commands: Commands,
    mut ev_activation: EventReader<SetMirrorActivationEvent>,
    mut q_mirrors: Query<&mut Mirror>,
    mut ev_sfx: EventWriter<PlaySfxEvent>,
) {
    for event in ev_activation.read() {
        let Ok(mut mirror) = q_mirrors.get_mut(event.mirror) else {
            continue;
        };
        let effects = mirror.set_activation(event.active);
        for object in effects.objects {
            set_object_active(&mut commands, object, effects.active);
        }
        if let Some(cue) = effects.cue {
            ev_sfx.send(PlaySfxEvent(cue));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    const EPSILON: f32 = 1e-3;

    fn deviation(mirror: &Mirror, transform: &Transform) -> f32 {
        wrap_angle(z_angle(transform.rotation) - mirror.reference_angle()).abs()
    }

    #[test]
    fn rotation_stays_clamped_while_duplicating() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let max_angle = rng.random_range(0.05..3.0);
            let start = rng.random_range(-PI..PI);
            let mut mirror = Mirror::default().with_max_angle(max_angle);
            let mut transform = Transform::from_rotation(Quat::from_rotation_z(start));
            let mut anchor = transform;

            assert!(mirror.start_duplicating(start));
            for _ in 0..100 {
                // includes single steps far larger than max_angle
                let delta = rng.random_range(-4.0..4.0);
                mirror.rotate(&mut transform, Some(&mut anchor), delta);
                assert!(
                    deviation(&mirror, &anchor) <= max_angle + EPSILON,
                    "anchor deviated {} > {}",
                    deviation(&mirror, &anchor),
                    max_angle
                );
                assert!(deviation(&mirror, &transform) <= max_angle + EPSILON);
            }
        }
    }

    #[test]
    fn clamp_without_anchor_uses_mirror_orientation() {
        let mut mirror = Mirror::default().with_max_angle(0.5);
        let mut transform = Transform::IDENTITY;
        mirror.start_duplicating(0.);

        mirror.rotate(&mut transform, None, 2.);
        assert!((z_angle(transform.rotation) - 0.5).abs() < EPSILON);
        mirror.rotate(&mut transform, None, -0.25);
        assert!((z_angle(transform.rotation) - 0.25).abs() < EPSILON);
        mirror.rotate(&mut transform, None, -3.);
        assert!((z_angle(transform.rotation) + 0.5).abs() < EPSILON);
    }

    #[test]
    fn reference_tracks_rotation_while_scanning() {
        let mut mirror = Mirror::default().with_max_angle(0.1);
        let mut transform = Transform::IDENTITY;
        mirror.rotate(&mut transform, None, FRAC_PI_2);
        assert!((mirror.reference_angle() - FRAC_PI_2).abs() < EPSILON);
        assert!((z_angle(transform.rotation) - FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn move_is_ignored_while_duplicating() {
        let mut mirror = Mirror::default();
        let mut transform = Transform::IDENTITY;
        mirror.start_duplicating(0.);
        assert!(!mirror.translate(&mut transform, Vec2::new(5., 5.)));
        assert_eq!(transform.translation.truncate(), Vec2::ZERO);

        mirror.stop_duplicating();
        assert!(mirror.translate(&mut transform, Vec2::new(5., 5.)));
        assert_eq!(transform.translation.truncate(), Vec2::new(5., 5.));
    }

    #[test]
    fn fixed_mirror_never_moves() {
        let mirror = Mirror::default().with_can_move(false);
        let mut transform = Transform::IDENTITY;
        assert!(!mirror.translate(&mut transform, Vec2::X));
        assert_eq!(transform, Transform::IDENTITY);
    }

    #[test]
    fn activation_only_cues_on_change() {
        let mut world = World::new();
        let gate = world.spawn_empty().id();
        let mut mirror = Mirror::default();
        mirror.link(gate);
        mirror.link(gate);

        let effects = mirror.set_activation(true);
        assert_eq!(effects.objects, vec![gate]);
        assert_eq!(effects.cue, Some(SoundEffect::MirrorActivated));
        assert!(mirror.is_activated());

        assert_eq!(mirror.set_activation(true).cue, None);
        assert_eq!(
            mirror.set_activation(false).cue,
            Some(SoundEffect::MirrorDeactivated)
        );
        assert_eq!(mirror.state(), DuplicationState::Scanning);
    }

    #[test]
    fn duplication_state_transitions() {
        let mut mirror = Mirror::default();
        assert_eq!(mirror.stop_duplicating(), None);
        assert!(mirror.start_duplicating(1.));
        assert!(!mirror.start_duplicating(2.));
        assert_eq!(mirror.reference_angle(), 1.);
        assert_eq!(mirror.stop_duplicating(), Some(Vec::new()));
        assert_eq!(mirror.state(), DuplicationState::Scanning);
    }

    #[test]
    fn max_angle_is_clamped() {
        assert_eq!(Mirror::default().with_max_angle(-1.).max_angle(), 0.);
        assert_eq!(Mirror::default().with_max_angle(10.).max_angle(), PI);
    }

    fn spawn_mirror_under(world: &mut World, parent_scale: Vec3, mirror_scale: Vec3) -> Entity {
        let root = world.spawn(Transform::from_scale(parent_scale)).id();
        let level = world.spawn(Transform::IDENTITY).set_parent(root).id();
        world
            .spawn((Mirror::default(), Transform::from_scale(mirror_scale)))
            .set_parent(level)
            .id()
    }

    #[test]
    fn anchor_requires_usable_parent_scale() {
        let mut world = World::new();
        let flat_mirror = spawn_mirror_under(&mut world, Vec3::ONE, Vec3::new(0., 1., 1.));
        let flat_level = spawn_mirror_under(&mut world, Vec3::new(1., 0., 1.), Vec3::ONE);

        let init = world.register_system(init_mirrors);
        world.run_system(init).unwrap();

        // only the scale above the mirror matters, clones never sit under the mirror itself
        let flat_mirror = world.get::<Mirror>(flat_mirror).unwrap();
        assert!(flat_mirror.anchor().is_some());
        assert!(flat_mirror.scan_zone().is_some());

        let flat_level = world.get::<Mirror>(flat_level).unwrap();
        assert_eq!(flat_level.anchor(), None);
        assert!(flat_level.scan_zone().is_some());
    }

    #[test]
    fn linked_objects_follow_mirror_activation() {
        let mut world = World::new();
        world.init_resource::<Events<SetMirrorActivationEvent>>();
        world.init_resource::<Events<PlaySfxEvent>>();
        let mirror = world.spawn(Mirror::default().with_id(3)).id();
        let gate = world.spawn(LinkedObject { mirror_id: 3 }).id();
        let stray = world.spawn(LinkedObject { mirror_id: 7 }).id();

        let link = world.register_system(link_objects);
        let activation = world.register_system(apply_mirror_activation);
        world.run_system(link).unwrap();

        assert_eq!(world.get::<Mirror>(mirror).unwrap().linked_objects(), &[gate]);
        assert_eq!(world.get::<Visibility>(gate), Some(&Visibility::Hidden));
        assert!(world.entity(gate).contains::<ColliderDisabled>());
        assert!(world.get::<Visibility>(stray).is_none());

        world.send_event(SetMirrorActivationEvent {
            mirror,
            active: true,
        });
        world.run_system(activation).unwrap();
        assert_eq!(world.get::<Visibility>(gate), Some(&Visibility::Inherited));
        assert!(!world.entity(gate).contains::<ColliderDisabled>());

        world.send_event(SetMirrorActivationEvent {
            mirror,
            active: false,
        });
        world.run_system(activation).unwrap();
        assert_eq!(world.get::<Visibility>(gate), Some(&Visibility::Hidden));
        assert!(world.entity(gate).contains::<ColliderDisabled>());

        let cues: Vec<_> = world
            .resource::<Events<PlaySfxEvent>>()
            .iter_current_update_events()
            .map(|PlaySfxEvent(cue)| *cue)
            .collect();
        assert_eq!(
            cues,
            vec![SoundEffect::MirrorActivated, SoundEffect::MirrorDeactivated]
        );
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3. * PI / 2.) + PI / 2.).abs() < EPSILON);
        assert!((wrap_angle(-3. * PI / 2.) - PI / 2.).abs() < EPSILON);
        assert!((wrap_angle(0.3) - 0.3).abs() < EPSILON);
    }
}
