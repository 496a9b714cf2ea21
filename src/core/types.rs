use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::utils::math::{matrix_position, matrix_rotation};

/// Rigid position and orientation of a body. Scale never enters the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Rigid part of an affine matrix; any scale is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        Self::new(matrix_position(matrix), matrix_rotation(matrix))
    }

    /// Builds a homogeneous matrix representation of the transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.conjugate() * (point - self.position)
    }

    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation.conjugate() * vector
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_point_round_trips() {
        let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.8));
        let p = Vec3::new(-4.0, 0.5, 2.0);
        let back = transform.inverse_transform_point(transform.transform_point(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-5);
    }

    #[test]
    fn from_matrix_strips_scale() {
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::IDENTITY,
            Vec3::new(0.0, 5.0, 0.0),
        );
        let transform = Transform::from_matrix(&matrix);
        assert_eq!(transform.position, Vec3::new(0.0, 5.0, 0.0));
        assert!(transform.rotation.dot(Quat::IDENTITY).abs() > 0.9999);
    }
}
