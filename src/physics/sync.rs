//! Transform exchange between scene entities and their bodies.
//!
//! Scene to physics writes the full rigid transform and resets motion;
//! physics to scene writes back position only.

use glam::{Mat4, Vec3};

use crate::{
    core::{collider::ColliderDesc, rigidbody::RigidBodyTriad, types::Transform},
    scene::{EntityId, SceneGraph},
    utils::math::{matrix_position, matrix_rotation},
};

pub struct TransformSyncBridge;

impl TransformSyncBridge {
    /// Body transform for a collider whose owner has world matrix `owner_world`.
    ///
    /// Static mesh colliders carry the owner transform in their vertices and
    /// stay at the identity.
    pub fn body_transform_for(desc: &ColliderDesc, owner_world: &Mat4) -> Transform {
        if desc.bakes_world_transform() {
            return Transform::IDENTITY;
        }
        Transform::new(
            matrix_position(owner_world) + desc.center_offset,
            matrix_rotation(owner_world),
        )
    }

    /// Teleports the body to its owner and clears its linear velocity.
    pub fn sync_from_entity(triad: &mut RigidBodyTriad, desc: &ColliderDesc, owner_world: &Mat4) {
        triad.set_world_transform(Self::body_transform_for(desc, owner_world));
        let body = triad.body_mut();
        body.set_linear_velocity(Vec3::ZERO);
        body.activate();
    }

    /// Copies the interpolated body position, minus the center offset, onto the owner.
    ///
    /// Rotation is never written back and static bodies are left alone.
    /// Returns false when nothing was written.
    pub fn sync_to_entity(
        triad: &RigidBodyTriad,
        desc: &ColliderDesc,
        owner: EntityId,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        if triad.body().is_static() || desc.is_static() {
            return false;
        }
        let position = triad.motion_state().world_transform().position - desc.center_offset;
        scene.set_local_position(owner, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{collider::ShapeKind, shape::CollisionShape},
        scene::{Entity, LocalTransform, Scene},
    };
    use approx::assert_relative_eq;
    use glam::Quat;

    fn triad(mass: f32) -> RigidBodyTriad {
        RigidBodyTriad::from_shape(
            CollisionShape::Box {
                half_extents: Vec3::splat(0.5),
            },
            mass,
            Transform::IDENTITY,
            true,
        )
    }

    #[test]
    fn body_transform_adds_offset_and_keeps_rotation() {
        let desc = ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_offset(Vec3::new(0.0, 1.0, 0.0));
        let world = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::from_rotation_y(0.5),
            Vec3::new(4.0, 0.0, 0.0),
        );

        let transform = TransformSyncBridge::body_transform_for(&desc, &world);
        assert_eq!(transform.position, Vec3::new(4.0, 1.0, 0.0));
        assert!(transform.rotation.dot(Quat::from_rotation_y(0.5)).abs() > 0.9999);
    }

    #[test]
    fn baked_static_mesh_stays_at_identity() {
        let desc = ColliderDesc::new(ShapeKind::Mesh, Vec3::ONE);
        let world = Mat4::from_translation(Vec3::splat(7.0));
        assert_eq!(
            TransformSyncBridge::body_transform_for(&desc, &world),
            Transform::IDENTITY
        );
    }

    #[test]
    fn sync_from_entity_resets_velocity() {
        let desc = ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_mass(1.0);
        let mut triad = triad(1.0);
        triad.body_mut().set_linear_velocity(Vec3::new(0.0, -3.0, 0.0));

        TransformSyncBridge::sync_from_entity(&mut triad, &desc, &Mat4::from_translation(Vec3::X));
        assert_eq!(triad.body().linear_velocity(), Vec3::ZERO);
        assert_eq!(triad.body().transform.position, Vec3::X);
        assert_eq!(triad.motion_state().world_transform().position, Vec3::X);
    }

    #[test]
    fn sync_to_entity_writes_position_only() {
        let mut scene = Scene::new();
        let rotation = Vec3::new(0.0, 1.0, 0.0);
        let owner = scene.spawn(Entity::new("crate").with_transform(LocalTransform {
            rotation,
            ..LocalTransform::default()
        }));
        let desc = ColliderDesc::new(ShapeKind::Box, Vec3::ONE)
            .with_mass(1.0)
            .with_offset(Vec3::new(0.0, 0.5, 0.0));
        let mut triad = triad(1.0);
        triad.set_world_transform(Transform::new(Vec3::new(1.0, 2.5, 3.0), Quat::from_rotation_x(1.0)));

        assert!(TransformSyncBridge::sync_to_entity(&triad, &desc, owner, &mut scene));
        let local = scene.entity(owner).unwrap().local_transform;
        assert_relative_eq!(local.position.y, 2.0, epsilon = 1e-6);
        assert_eq!(local.rotation, rotation);
    }

    #[test]
    fn static_body_is_not_written_back() {
        let mut scene = Scene::new();
        let owner = scene.spawn(Entity::new("wall").with_position(Vec3::ONE));
        let desc = ColliderDesc::new(ShapeKind::Box, Vec3::ONE);
        let mut triad = triad(0.0);
        triad.set_world_transform(Transform::from_position(Vec3::splat(9.0)));

        assert!(!TransformSyncBridge::sync_to_entity(&triad, &desc, owner, &mut scene));
        assert_eq!(scene.entity(owner).unwrap().local_transform.position, Vec3::ONE);
    }
}
