//! Additional math helpers layered on top of `glam`.

use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Euler angles (radians, pitch = x, yaw = y, roll = z) applied yaw, then pitch, then roll.
pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z)
}

/// Translation column of an affine matrix.
pub fn matrix_position(matrix: &Mat4) -> Vec3 {
    matrix.w_axis.truncate()
}

/// Rotation of an affine matrix with scale stripped.
pub fn matrix_rotation(matrix: &Mat4) -> Quat {
    let (_, rotation, _) = matrix.to_scale_rotation_translation();
    rotation.normalize()
}

/// Replaces the clip-space z row with the w row so every vertex lands on the far plane.
pub fn force_far_plane(clip: Mat4) -> Mat4 {
    let mut result = clip;
    for column in [
        &mut result.x_axis,
        &mut result.y_axis,
        &mut result.z_axis,
        &mut result.w_axis,
    ] {
        *column = Vec4::new(column.x, column.y, column.w, column.w);
    }
    result
}
