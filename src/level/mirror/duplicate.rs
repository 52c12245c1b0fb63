use bevy::{color::Alpha, ecs::world::Command, prelude::*};
use bevy_rapier2d::prelude::*;

use crate::{
    level::entity::BodyDescriptor,
    shared::GroupLabel,
    sound::{PlaySfxEvent, SoundEffect},
    spatial::{z_angle, OverlapZone, SpatialIndex},
    utils::reparent::{world_transform, ReparentInPlace},
};

use super::{DuplicateAnchor, DuplicationState, Mirror, ToggleMirrorModeEvent, ZoneEffect};

/// Opacity of a cloned sprite.
pub const GHOST_ALPHA: f32 = 0.5;

/// Zone effects are drawn just behind whatever they are attached to.
const ZONE_EFFECT_Z: f32 = -1.;

/// Marks a clone created by a duplicating mirror.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    pub source: Entity,
}

/// Marks an entity drawn with the translucent clone treatment.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Ghost;

/// Where a mirror sits when it is toggled.
#[derive(Debug, Clone, Copy)]
pub struct MirrorPose {
    pub local: Transform,
    pub parent: Option<Entity>,
    pub world: GlobalTransform,
}

/// [`System`] that flips every mirror named by a [`ToggleMirrorModeEvent`] between scanning and
/// duplicating. Generic over the [`SpatialIndex`] so it can run without a physics world.
pub fn handle_toggle_mirror_mode<S: SpatialIndex + Component>(
    mut commands: Commands,
    mut ev_toggle: EventReader<ToggleMirrorModeEvent>,
    mut q_mirrors: Query<(&mut Mirror, &Transform, Option<&Parent>)>,
    mut q_anchors: Query<&mut Transform, (With<DuplicateAnchor>, Without<Mirror>)>,
    q_globals: Query<&GlobalTransform>,
    q_bodies: Query<Option<&BodyDescriptor>>,
    q_index: Query<&S>,
    mut ev_sfx: EventWriter<PlaySfxEvent>,
) {
    for ToggleMirrorModeEvent(entity) in ev_toggle.read() {
        let Ok((mut mirror, transform, parent)) = q_mirrors.get_mut(*entity) else {
            continue;
        };
        let parent = parent.map(Parent::get);
        let parent_world = parent
            .and_then(|parent| q_globals.get(parent).ok())
            .copied()
            .unwrap_or_default();
        let pose = MirrorPose {
            local: *transform,
            parent,
            world: parent_world * GlobalTransform::from(*transform),
        };
        let anchor = mirror.anchor().and_then(|anchor| q_anchors.get_mut(anchor).ok());

        let cue = toggle_mode(
            &mut commands,
            *entity,
            &mut mirror,
            pose,
            anchor,
            q_index.get_single().ok(),
            |body| q_bodies.get(body).ok().flatten().copied(),
        );
        ev_sfx.send(PlaySfxEvent(cue));
    }
}

/// Moves `mirror` to the other [`DuplicationState`] and returns the cue to play.
pub fn toggle_mode(
    commands: &mut Commands,
    entity: Entity,
    mirror: &mut Mirror,
    pose: MirrorPose,
    anchor: Option<Mut<Transform>>,
    index: Option<&impl SpatialIndex>,
    descriptor: impl Fn(Entity) -> Option<BodyDescriptor>,
) -> SoundEffect {
    match mirror.state() {
        DuplicationState::Scanning => {
            let bodies = match index {
                Some(index) => capture_overlapping_bodies(index, entity, mirror, &pose, descriptor),
                None => {
                    warn!("No spatial index, mirror {:?} duplicates nothing", entity);
                    Vec::new()
                }
            };
            enable_duplication(commands, entity, mirror, pose, anchor, bodies);
            SoundEffect::DuplicatingEnabled
        }
        DuplicationState::Duplicating => {
            disable_duplication(commands, entity, mirror, pose);
            SoundEffect::DuplicatingDisabled
        }
    }
}

/// The bodies overlapping the scan zone of `mirror` that it is allowed to clone.
pub fn capture_overlapping_bodies(
    index: &impl SpatialIndex,
    entity: Entity,
    mirror: &Mirror,
    pose: &MirrorPose,
    descriptor: impl Fn(Entity) -> Option<BodyDescriptor>,
) -> Vec<Entity> {
    let zone = OverlapZone::around(&pose.world, mirror.scan_half_extents());
    let filter = QueryFilter::only_dynamic().exclude_sensors();
    index
        .overlapping(&zone, filter)
        .into_iter()
        .filter(|&body| is_duplicable(body, entity, descriptor(body).as_ref()))
        .collect()
}

/// Bodies without a [`BodyDescriptor`] are duplicable. A mirror never duplicates itself.
pub fn is_duplicable(candidate: Entity, mirror: Entity, descriptor: Option<&BodyDescriptor>) -> bool {
    candidate != mirror && descriptor.map_or(true, |descriptor| descriptor.duplicable)
}

fn enable_duplication(
    commands: &mut Commands,
    entity: Entity,
    mirror: &mut Mirror,
    pose: MirrorPose,
    anchor: Option<Mut<Transform>>,
    bodies: Vec<Entity>,
) {
    if !mirror.start_duplicating(z_angle(pose.local.rotation)) {
        return;
    }

    if let Some(mut anchor) = anchor {
        anchor.translation = pose.local.translation;
        anchor.rotation = pose.local.rotation;
    }

    let clone_parent = mirror.anchor().or(pose.parent);
    mirror.cloned = bodies
        .into_iter()
        .map(|source| {
            let clone = commands.spawn_empty().id();
            commands.queue(DuplicateBody {
                mirror: entity,
                source,
                clone,
                parent: clone_parent,
            });
            clone
        })
        .collect();
    debug!("Duplicating {} bodies", mirror.cloned().len());

    // the scan zone stays where the scan happened
    if let Some(scan_zone) = mirror.scan_zone() {
        commands.queue(ReparentInPlace {
            child: scan_zone,
            parent: pose.parent,
        });
    }

    let (zone_parent, zone_transform) = match mirror.anchor() {
        Some(anchor) => (Some(anchor), Transform::IDENTITY),
        None => (pose.parent, pose.local),
    };
    mirror.duplicate_zone = Some(spawn_zone_effect(
        commands,
        ZoneEffect::Duplicate,
        zone_parent,
        zone_transform,
        mirror.scan_half_extents(),
    ));
}

fn disable_duplication(
    commands: &mut Commands,
    entity: Entity,
    mirror: &mut Mirror,
    pose: MirrorPose,
) {
    let Some(clones) = mirror.stop_duplicating() else {
        return;
    };
    debug!("Removing {} duplicates", clones.len());

    for stale in clones
        .into_iter()
        .chain(mirror.scan_zone.take())
        .chain(mirror.duplicate_zone.take())
    {
        if let Some(stale) = commands.get_entity(stale) {
            stale.despawn_recursive();
        }
    }

    mirror.scan_zone = Some(spawn_zone_effect(
        commands,
        ZoneEffect::Scan,
        Some(entity),
        Transform::IDENTITY,
        mirror.scan_half_extents(),
    ));
    debug!(
        "Scan zone restored at {:?}",
        pose.world.translation().truncate()
    );
}

/// Spawns a translucent [`ZoneEffect`] of the given size under `parent` (or the world root).
pub fn spawn_zone_effect(
    commands: &mut Commands,
    kind: ZoneEffect,
    parent: Option<Entity>,
    transform: Transform,
    half_extents: Vec2,
) -> Entity {
    let color = match kind {
        ZoneEffect::Scan => Color::srgba(0.6, 0.9, 1.0, 0.15),
        ZoneEffect::Duplicate => Color::srgba(0.8, 0.6, 1.0, 0.2),
    };
    let mut zone = commands.spawn((
        kind,
        Sprite::from_color(color, half_extents * 2.),
        transform.with_translation(transform.translation.with_z(ZONE_EFFECT_Z)),
    ));
    if let Some(parent) = parent {
        zone.set_parent(parent);
    }
    zone.id()
}

/// [`Command`] that turns the reserved `clone` entity into a ghost copy of `source` and moves it
/// under `parent`, keeping it exactly where `source` is.
///
/// The clone gets the source's shape, collision filters and sprite but none of its simulation
/// state: it is a kinematic body that only moves with its parent. It does not collide with
/// dynamic bodies, since it starts out on top of its source. If `source` is gone, the clone is
/// discarded and dropped from `mirror`'s clone list.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateBody {
    pub mirror: Entity,
    pub source: Entity,
    pub clone: Entity,
    pub parent: Option<Entity>,
}

impl Command for DuplicateBody {
    fn apply(self, world: &mut World) {
        if !world.entities().contains(self.clone) {
            return;
        }
        let Some(source_world) = world_transform(world, self.source) else {
            warn!("Duplicated body {:?} no longer exists", self.source);
            world.entity_mut(self.clone).despawn_recursive();
            if let Some(mut mirror) = world.get_mut::<Mirror>(self.mirror) {
                mirror.cloned.retain(|clone| *clone != self.clone);
            }
            return;
        };

        let collider = world.get::<Collider>(self.source).cloned();
        let filters = world
            .get::<CollisionGroups>(self.source)
            .map_or(GroupLabel::ALL, |groups| groups.filters)
            & !GroupLabel::BODY;
        let sprite = world.get::<Sprite>(self.source).cloned();

        let mut clone = world.entity_mut(self.clone);
        clone.insert((
            Duplicate {
                source: self.source,
            },
            source_world.compute_transform(),
            Visibility::default(),
            RigidBody::KinematicPositionBased,
            CollisionGroups::new(GroupLabel::DUPLICATE, filters),
        ));
        if let Some(collider) = collider {
            clone.insert(collider);
        }
        if let Some(mut sprite) = sprite {
            sprite.color = sprite.color.with_alpha(GHOST_ALPHA);
            clone.insert((sprite, Ghost));
        }

        ReparentInPlace {
            child: self.clone,
            parent: self.parent,
        }
        .apply(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_and_non_duplicable_bodies_are_excluded() {
        let mut world = World::new();
        let [mirror, body] = [(); 2].map(|_| world.spawn_empty().id());

        assert!(!is_duplicable(mirror, mirror, None));
        assert!(is_duplicable(body, mirror, None));
        assert!(is_duplicable(
            body,
            mirror,
            Some(&BodyDescriptor { duplicable: true })
        ));
        assert!(!is_duplicable(
            body,
            mirror,
            Some(&BodyDescriptor { duplicable: false })
        ));
    }

    #[test]
    fn duplicate_body_copies_shape_without_simulation() {
        let mut world = World::new();
        let anchor = world
            .spawn(Transform::from_xyz(10., 0., 0.).with_rotation(Quat::from_rotation_z(0.5)))
            .id();
        let source = world
            .spawn((
                Transform::from_xyz(4., 6., 0.),
                Collider::cuboid(4., 4.),
                CollisionGroups::new(GroupLabel::BODY, GroupLabel::TERRAIN),
                RigidBody::Dynamic,
                Velocity::linear(Vec2::new(3., 0.)),
                Sprite::from_color(Color::WHITE, Vec2::splat(8.)),
            ))
            .id();
        let clone = world.spawn_empty().id();

        DuplicateBody {
            mirror: Entity::PLACEHOLDER,
            source,
            clone,
            parent: Some(anchor),
        }
        .apply(&mut world);

        let clone_ref = world.entity(clone);
        assert_eq!(clone_ref.get::<Parent>().map(Parent::get), Some(anchor));
        assert_eq!(
            clone_ref.get::<RigidBody>(),
            Some(&RigidBody::KinematicPositionBased)
        );
        assert!(clone_ref.get::<Velocity>().is_none());
        assert!(clone_ref.get::<Collider>().is_some());
        assert!(clone_ref.contains::<Ghost>());
        assert_eq!(
            clone_ref.get::<CollisionGroups>().map(|g| g.memberships),
            Some(GroupLabel::DUPLICATE)
        );
        // the source keeps its terrain filter, but the clone must not shove it around
        assert_eq!(
            clone_ref.get::<CollisionGroups>().map(|g| g.filters),
            Some(GroupLabel::TERRAIN)
        );
        assert_eq!(
            clone_ref.get::<Sprite>().map(|s| s.color.alpha()),
            Some(GHOST_ALPHA)
        );

        let clone_world = world_transform(&world, clone).unwrap();
        assert!(clone_world
            .translation()
            .abs_diff_eq(Vec3::new(4., 6., 0.), 1e-4));
    }

    #[test]
    fn duplicate_of_missing_body_is_discarded() {
        let mut world = World::new();
        let source = world.spawn(Transform::IDENTITY).id();
        world.despawn(source);
        let kept = world.spawn_empty().id();
        let clone = world.spawn_empty().id();
        let mut mirror = Mirror::default();
        mirror.cloned = vec![kept, clone];
        let mirror = world.spawn(mirror).id();

        DuplicateBody {
            mirror,
            source,
            clone,
            parent: None,
        }
        .apply(&mut world);
        assert!(!world.entities().contains(clone));
        assert_eq!(world.get::<Mirror>(mirror).unwrap().cloned(), &[kept]);
    }

    #[test]
    fn clones_never_collide_with_dynamic_bodies() {
        let mut world = World::new();
        let source = world
            .spawn((
                Transform::IDENTITY,
                Collider::ball(2.),
                CollisionGroups::new(GroupLabel::BODY, GroupLabel::ALL),
            ))
            .id();
        let clone = world.spawn_empty().id();

        DuplicateBody {
            mirror: Entity::PLACEHOLDER,
            source,
            clone,
            parent: None,
        }
        .apply(&mut world);

        let groups = *world.get::<CollisionGroups>(clone).unwrap();
        assert!(!groups.filters.contains(GroupLabel::BODY));
        assert!(groups.filters.contains(GroupLabel::PLAYER_COLLIDER));
        assert!(groups.filters.contains(GroupLabel::PLAYER_SENSOR));
    }
}
