use glam::Vec3;

use crate::{
    core::{rigidbody::RigidBody, types::Transform},
    utils::math::angular_velocity_to_quat,
};

/// Semi-implicit Euler integrator for rigid bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integrator;

impl Integrator {
    pub fn new() -> Self {
        Self
    }

    /// Applies accumulated forces and damping to the body velocity.
    pub fn integrate_velocity(&self, body: &mut RigidBody, dt: f32) {
        if body.is_static() || !body.is_active() {
            return;
        }

        let acceleration = body.total_force() * body.inverse_mass();
        body.velocity.linear += acceleration * body.linear_factor * dt;

        body.velocity.linear *= (1.0 - body.linear_damping * dt).max(0.0);
        body.velocity.angular *= (1.0 - body.angular_damping * dt).max(0.0);
        body.velocity.angular *= body.angular_factor;
    }

    /// Advances the body transform by its current velocity.
    pub fn integrate_position(&self, body: &mut RigidBody, dt: f32) {
        if body.is_static() || !body.is_active() {
            return;
        }
        body.transform = Self::predict(&body.transform, body.velocity.linear, body.velocity.angular, dt);
    }

    /// Transform reached after `dt` at constant velocity.
    pub fn predict(transform: &Transform, linear: Vec3, angular: Vec3, dt: f32) -> Transform {
        let rotation = (angular_velocity_to_quat(angular, dt) * transform.rotation).normalize();
        Transform::new(transform.position + linear * dt, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBodyConstruction;
    use approx::assert_relative_eq;

    #[test]
    fn gravity_force_accelerates_dynamic_body() {
        let mut body = RigidBody::new(&RigidBodyConstruction::new(2.0, Transform::IDENTITY, Vec3::ONE));
        body.set_gravity(Vec3::new(0.0, -10.0, 0.0));
        body.apply_gravity();

        let integrator = Integrator::new();
        integrator.integrate_velocity(&mut body, 0.1);
        integrator.integrate_position(&mut body, 0.1);

        assert_relative_eq!(body.linear_velocity().y, -1.0, epsilon = 1e-6);
        assert_relative_eq!(body.transform.position.y, -0.1, epsilon = 1e-6);
    }

    #[test]
    fn static_body_never_moves() {
        let mut body = RigidBody::new(&RigidBodyConstruction::new(0.0, Transform::IDENTITY, Vec3::ZERO));
        body.set_linear_velocity(Vec3::X);
        Integrator::new().integrate_position(&mut body, 1.0);
        assert_eq!(body.transform.position, Vec3::ZERO);
    }
}
