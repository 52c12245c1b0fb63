use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// An oriented box in world space used for overlap queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapZone {
    pub center: Vec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
    pub half_extents: Vec2,
}

impl OverlapZone {
    pub fn new(center: Vec2, rotation: f32, half_extents: Vec2) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// Zone covering `half_extents` around the origin of `world`.
    pub fn around(world: &GlobalTransform, half_extents: Vec2) -> Self {
        let (_, rotation, translation) = world.to_scale_rotation_translation();
        Self::new(translation.truncate(), z_angle(rotation), half_extents)
    }
}

/// Answers "what is overlapping this zone right now". Implemented by the physics backend.
pub trait SpatialIndex {
    fn overlapping(&self, zone: &OverlapZone, filter: QueryFilter<'_>) -> Vec<Entity>;

    fn any_overlapping(&self, zone: &OverlapZone, filter: QueryFilter<'_>) -> bool {
        !self.overlapping(zone, filter).is_empty()
    }
}

impl SpatialIndex for RapierContext {
    fn overlapping(&self, zone: &OverlapZone, filter: QueryFilter<'_>) -> Vec<Entity> {
        let shape = Collider::cuboid(zone.half_extents.x, zone.half_extents.y);
        let mut found = Vec::new();
        self.intersections_with_shape(zone.center, zone.rotation, &shape, filter, |entity| {
            found.push(entity);
            true
        });
        found
    }

    fn any_overlapping(&self, zone: &OverlapZone, filter: QueryFilter<'_>) -> bool {
        let shape = Collider::cuboid(zone.half_extents.x, zone.half_extents.y);
        let mut hit = false;
        self.intersections_with_shape(zone.center, zone.rotation, &shape, filter, |_| {
            hit = true;
            false
        });
        hit
    }
}

/// Rotation of `rotation` around the z axis, in `(-PI, PI]`.
pub fn z_angle(rotation: Quat) -> f32 {
    let facing = rotation * Vec3::X;
    facing.y.atan2(facing.x)
}
