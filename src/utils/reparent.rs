use bevy::{ecs::world::Command, prelude::*};

use crate::error::GeometryError;

/// Computes the local [`Transform`] a child needs under `new_parent_world` so that its world
/// pose stays `child_world`. `None` means the child becomes a root entity.
///
/// Scale is divided component-wise, so a parent with non-uniform scale and a rotation relative
/// to the child only preserves translation and per-axis scale, not the exact sheared shape.
pub fn reparented_transform(
    child_world: &GlobalTransform,
    new_parent_world: Option<&GlobalTransform>,
) -> Result<Transform, GeometryError> {
    let (child_scale, child_rotation, child_translation) =
        child_world.to_scale_rotation_translation();

    let Some(parent_world) = new_parent_world else {
        return Ok(Transform {
            translation: child_translation,
            rotation: child_rotation,
            scale: child_scale,
        });
    };

    let (parent_scale, parent_rotation, parent_translation) =
        parent_world.to_scale_rotation_translation();
    validate_parent_scale(parent_scale)?;

    let inverse_rotation = parent_rotation.inverse();
    Ok(Transform {
        translation: inverse_rotation * (child_translation - parent_translation) / parent_scale,
        rotation: inverse_rotation * child_rotation,
        scale: child_scale / parent_scale,
    })
}

/// A scale can only act as a parent scale if every component is finite and non-zero.
pub fn validate_parent_scale(scale: Vec3) -> Result<(), GeometryError> {
    if !scale.is_finite() || scale.x == 0.0 || scale.y == 0.0 || scale.z == 0.0 {
        return Err(GeometryError::DegenerateScale { scale });
    }
    Ok(())
}

/// Composes the [`Transform`]s along the [`Parent`] chain of `entity`.
///
/// Unlike [`GlobalTransform`], this reflects changes made earlier in the same schedule run,
/// before transform propagation.
pub fn world_transform(world: &World, entity: Entity) -> Option<GlobalTransform> {
    compose_transform_chain(entity, |entity| {
        Some((
            *world.get::<Transform>(entity)?,
            world.get::<Parent>(entity).map(Parent::get),
        ))
    })
}

/// Same as [`world_transform`], for callers that can only look up one entity at a time.
/// `node` returns the local transform and the parent of an entity. The walk stops at the first
/// ancestor without a transform.
pub fn compose_transform_chain(
    entity: Entity,
    node: impl Fn(Entity) -> Option<(Transform, Option<Entity>)>,
) -> Option<GlobalTransform> {
    let (transform, mut parent) = node(entity)?;
    let mut global = GlobalTransform::from(transform);
    while let Some((parent_transform, grandparent)) = parent.and_then(&node) {
        global = GlobalTransform::from(parent_transform) * global;
        parent = grandparent;
    }
    Some(global)
}

/// [`Command`] that moves `child` under `parent` (or to the root) without changing where it is
/// drawn.
#[derive(Debug, Clone, Copy)]
pub struct ReparentInPlace {
    pub child: Entity,
    pub parent: Option<Entity>,
}

impl Command for ReparentInPlace {
    fn apply(self, world: &mut World) {
        let Some(child_world) = world_transform(world, self.child) else {
            return;
        };
        let parent_world = match self.parent {
            Some(parent) => match world_transform(world, parent) {
                Some(parent_world) => Some(parent_world),
                None => return,
            },
            None => None,
        };

        let mut child = world.entity_mut(self.child);
        match reparented_transform(&child_world, parent_world.as_ref()) {
            Ok(local) => {
                match self.parent {
                    Some(parent) => child.set_parent(parent),
                    None => child.remove_parent(),
                };
                child.insert(local);
            }
            Err(err) => {
                warn!(
                    "Could not reparent {:?} under {:?} ({}), leaving it at the root",
                    self.child, self.parent, err
                );
                child.remove_parent();
                child.insert(child_world.compute_transform());
            }
        }
    }
}
