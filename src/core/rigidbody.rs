use bitflags::bitflags;
use glam::{Mat3, Vec3};

use super::{motion_state::MotionState, shape::CollisionShape, types::{Transform, Velocity}};
use crate::{
    config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING},
    utils::allocator::Handle,
};

/// Handle of a body inside a [`DynamicsWorld`](crate::world::DynamicsWorld).
pub type BodyHandle = Handle<RigidBodyTriad>;

bitflags! {
    /// Collision behaviour flags of a body.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CollisionFlags: u32 {
        const STATIC_OBJECT = 1;
        /// Overlaps are detected and reported but never resolved.
        const NO_CONTACT_RESPONSE = 1 << 2;
    }
}

bitflags! {
    /// Per-body simulation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BodyFlags: u32 {
        /// World gravity changes never override this body's gravity.
        const DISABLE_WORLD_GRAVITY = 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    #[default]
    Active,
    Sleeping,
    /// Never put to sleep.
    DisableDeactivation,
}

/// Parameters used to create a [`RigidBody`].
#[derive(Debug, Clone, Copy)]
pub struct RigidBodyConstruction {
    pub mass: f32,
    pub start_transform: Transform,
    pub local_inertia: Vec3,
    pub friction: f32,
    pub restitution: f32,
}

impl RigidBodyConstruction {
    pub fn new(mass: f32, start_transform: Transform, local_inertia: Vec3) -> Self {
        Self {
            mass,
            start_transform,
            local_inertia,
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

/// Rigid body state advanced by the dynamics world.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub transform: Transform,
    pub velocity: Velocity,
    pub linear_factor: Vec3,
    pub angular_factor: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    total_force: Vec3,
    gravity: Vec3,
    mass: f32,
    inverse_mass: f32,
    local_inertia: Vec3,
    inverse_inertia_local: Vec3,
    collision_flags: CollisionFlags,
    body_flags: BodyFlags,
    activation: ActivationState,
    deactivation_time: f32,
}

impl RigidBody {
    pub fn new(info: &RigidBodyConstruction) -> Self {
        let mass = info.mass.max(0.0);
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        let inverse_inertia_local = Vec3::select(
            info.local_inertia.cmpgt(Vec3::ZERO),
            info.local_inertia.recip(),
            Vec3::ZERO,
        );
        let collision_flags = if mass > 0.0 {
            CollisionFlags::empty()
        } else {
            CollisionFlags::STATIC_OBJECT
        };

        Self {
            transform: info.start_transform,
            velocity: Velocity::default(),
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            friction: info.friction,
            restitution: info.restitution,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            total_force: Vec3::ZERO,
            gravity: Vec3::ZERO,
            mass,
            inverse_mass,
            local_inertia: info.local_inertia,
            inverse_inertia_local,
            collision_flags,
            body_flags: BodyFlags::empty(),
            activation: ActivationState::Active,
            deactivation_time: 0.0,
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn local_inertia(&self) -> Vec3 {
        self.local_inertia
    }

    /// Mass zero bodies never move.
    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    /// World-space inverse inertia tensor, R * diag(I⁻¹) * Rᵀ.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let rotation = Mat3::from_quat(self.transform.rotation);
        rotation * Mat3::from_diagonal(self.inverse_inertia_local) * rotation.transpose()
    }

    pub fn collision_flags(&self) -> CollisionFlags {
        self.collision_flags
    }

    pub fn set_collision_flags(&mut self, flags: CollisionFlags) {
        self.collision_flags = flags;
    }

    pub fn has_contact_response(&self) -> bool {
        !self.collision_flags.contains(CollisionFlags::NO_CONTACT_RESPONSE)
    }

    pub fn body_flags(&self) -> BodyFlags {
        self.body_flags
    }

    pub fn set_body_flags(&mut self, flags: BodyFlags) {
        self.body_flags = flags;
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    /// [`activate`](Self::activate) never clears `DisableDeactivation`.
    pub fn set_activation_state(&mut self, state: ActivationState) {
        self.activation = state;
        self.deactivation_time = 0.0;
    }

    pub fn activate(&mut self) {
        if self.activation == ActivationState::Sleeping {
            self.activation = ActivationState::Active;
        }
        self.deactivation_time = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.activation != ActivationState::Sleeping
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.velocity.linear
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity.linear = velocity;
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.velocity.angular
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.velocity.angular = velocity;
    }

    pub fn apply_central_force(&mut self, force: Vec3) {
        self.total_force += force * self.linear_factor;
    }

    pub fn total_force(&self) -> Vec3 {
        self.total_force
    }

    pub fn clear_forces(&mut self) {
        self.total_force = Vec3::ZERO;
    }

    /// Adds `gravity * mass` to the accumulated force.
    pub fn apply_gravity(&mut self) {
        if self.is_dynamic() {
            self.apply_central_force(self.gravity * self.mass);
        }
    }

    /// Applies an impulse at `relative_position` from the center of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3, relative_position: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.linear += impulse * self.linear_factor * self.inverse_mass;
        let angular = self.inverse_inertia_world() * relative_position.cross(impulse * self.linear_factor);
        self.velocity.angular += angular * self.angular_factor;
    }

    /// Velocity of the material point at `relative_position`.
    pub fn velocity_at(&self, relative_position: Vec3) -> Vec3 {
        self.velocity.linear + self.velocity.angular.cross(relative_position)
    }

    /// Accumulates time spent below the sleep thresholds; returns true when the body fell asleep.
    pub fn update_deactivation(
        &mut self,
        dt: f32,
        linear_threshold: f32,
        angular_threshold: f32,
        time_to_sleep: f32,
    ) -> bool {
        if self.is_static() || self.activation != ActivationState::Active {
            return false;
        }
        let resting = self.velocity.linear.length_squared() < linear_threshold * linear_threshold
            && self.velocity.angular.length_squared() < angular_threshold * angular_threshold;
        if !resting {
            self.deactivation_time = 0.0;
            return false;
        }
        self.deactivation_time += dt;
        if self.deactivation_time > time_to_sleep {
            self.activation = ActivationState::Sleeping;
            self.velocity = Velocity::default();
            return true;
        }
        false
    }
}

/// A body together with the motion state and collision shape it owns.
///
/// Fields drop in declaration order: body, then motion state, then shape.
#[derive(Debug, Clone)]
pub struct RigidBodyTriad {
    body: RigidBody,
    motion_state: MotionState,
    shape: CollisionShape,
}

impl RigidBodyTriad {
    pub fn new(body: RigidBody, motion_state: MotionState, shape: CollisionShape) -> Self {
        Self {
            body,
            motion_state,
            shape,
        }
    }

    /// Builds the body, its motion state and inertia from the shape in one go.
    pub fn from_shape(
        shape: CollisionShape,
        mass: f32,
        start_transform: Transform,
        compute_inertia: bool,
    ) -> Self {
        let local_inertia = if compute_inertia && mass > 0.0 {
            shape.local_inertia(mass)
        } else {
            Vec3::ZERO
        };
        let info = RigidBodyConstruction::new(mass, start_transform, local_inertia);
        Self::new(
            RigidBody::new(&info),
            MotionState::new(start_transform),
            shape,
        )
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RigidBody {
        &mut self.body
    }

    pub fn motion_state(&self) -> &MotionState {
        &self.motion_state
    }

    pub fn motion_state_mut(&mut self) -> &mut MotionState {
        &mut self.motion_state
    }

    pub fn shape(&self) -> &CollisionShape {
        &self.shape
    }

    pub fn parts_mut(&mut self) -> (&mut RigidBody, &mut MotionState, &CollisionShape) {
        (&mut self.body, &mut self.motion_state, &self.shape)
    }

    /// Teleports body and motion state to `transform`.
    pub fn set_world_transform(&mut self, transform: Transform) {
        self.body.transform = transform;
        self.motion_state.set_world_transform(transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box(mass: f32) -> RigidBodyTriad {
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
    fn zero_mass_body_is_static() {
        let triad = unit_box(0.0);
        assert!(triad.body().is_static());
        assert!(triad
            .body()
            .collision_flags()
            .contains(CollisionFlags::STATIC_OBJECT));
        assert_eq!(triad.body().local_inertia(), Vec3::ZERO);
    }

    #[test]
    fn impulse_respects_linear_factor() {
        let mut triad = unit_box(2.0);
        triad.body_mut().linear_factor = Vec3::new(1.0, 0.0, 1.0);
        triad.body_mut().apply_impulse(Vec3::new(2.0, 2.0, 0.0), Vec3::ZERO);
        let v = triad.body().linear_velocity();
        assert_relative_eq!(v.x, 1.0);
        assert_relative_eq!(v.y, 0.0);
    }

    #[test]
    fn zero_angular_factor_blocks_spin() {
        let mut triad = unit_box(1.0);
        triad.body_mut().angular_factor = Vec3::ZERO;
        triad
            .body_mut()
            .apply_impulse(Vec3::X, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(triad.body().angular_velocity(), Vec3::ZERO);
    }

    #[test]
    fn resting_body_falls_asleep() {
        let mut triad = unit_box(1.0);
        let body = triad.body_mut();
        let mut slept = false;
        for _ in 0..200 {
            slept |= body.update_deactivation(1.0 / 60.0, 0.8, 1.0, 2.0);
        }
        assert!(slept);
        assert!(!body.is_active());

        body.set_activation_state(ActivationState::DisableDeactivation);
        for _ in 0..200 {
            assert!(!body.update_deactivation(1.0 / 60.0, 0.8, 1.0, 2.0));
        }
    }
}
