pub mod configuration;

use glam::Vec3;
use log::debug;

use crate::{
    collision::{
        broadphase::{BroadPhase, BroadPhaseProxy},
        contact::{CollisionEvent, ContactManifold},
        narrowphase::CollisionDispatcher,
        queries::{RayHit, Raycast},
    },
    config::DEFAULT_GRAVITY,
    core::rigidbody::{BodyFlags, BodyHandle, RigidBodyTriad},
    dynamics::{integrator::Integrator, solver::SequentialImpulseSolver},
    utils::{allocator::Arena, logging::ScopedTimer},
};

pub use configuration::CollisionConfiguration;

/// Discrete dynamics world stepped with a fixed internal time step.
///
/// Field order is drop order: remaining bodies are released before the
/// solver, broadphase, dispatcher and configuration.
pub struct DynamicsWorld {
    bodies: Arena<RigidBodyTriad>,
    solver: SequentialImpulseSolver,
    integrator: Integrator,
    broadphase: BroadPhase,
    dispatcher: CollisionDispatcher,
    configuration: CollisionConfiguration,
    gravity: Vec3,
    local_time: f32,
    events: Vec<CollisionEvent>,
}

impl Default for DynamicsWorld {
    fn default() -> Self {
        Self::new(CollisionConfiguration::default())
    }
}

impl DynamicsWorld {
    pub fn new(configuration: CollisionConfiguration) -> Self {
        Self {
            bodies: Arena::new(),
            solver: configuration.solver(),
            integrator: Integrator::new(),
            broadphase: configuration.broadphase(),
            dispatcher: CollisionDispatcher::new(),
            configuration,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            local_time: 0.0,
            events: Vec::new(),
        }
    }

    pub fn configuration(&self) -> &CollisionConfiguration {
        &self.configuration
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Pushes the new gravity to every dynamic body that follows world gravity.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        for (_, triad) in self.bodies.iter_mut() {
            let body = triad.body_mut();
            if body.is_static() || body.body_flags().contains(BodyFlags::DISABLE_WORLD_GRAVITY) {
                continue;
            }
            body.set_gravity(gravity);
        }
    }

    pub fn add_rigid_body(&mut self, mut triad: RigidBodyTriad) -> BodyHandle {
        let body = triad.body_mut();
        if body.is_dynamic() && !body.body_flags().contains(BodyFlags::DISABLE_WORLD_GRAVITY) {
            body.set_gravity(self.gravity);
        }
        let handle = self.bodies.insert(triad);
        debug!("Added rigid body {:?} ({} total)", handle.id(), self.bodies.len());
        handle
    }

    /// Detaches the body and hands the triad back to the caller.
    pub fn remove_rigid_body(&mut self, handle: BodyHandle) -> Option<RigidBodyTriad> {
        let triad = self.bodies.remove(handle)?;
        self.events.retain(|event| !event.involves(handle));
        Some(triad)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBodyTriad> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBodyTriad> {
        self.bodies.get_mut(handle)
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBodyTriad)> + '_ {
        self.bodies.iter()
    }

    /// Time carried over to the next call, always below one fixed step.
    pub fn local_time(&self) -> f32 {
        self.local_time
    }

    /// Overlaps found during the last `step_simulation` that ran at least one step.
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Advances by `dt` in fixed steps of `fixed_time_step`.
    ///
    /// At most `max_sub_steps` steps run; time owed beyond that is dropped.
    /// A negative or non-finite `dt` is ignored. Returns the number of steps taken.
    pub fn step_simulation(&mut self, dt: f32, max_sub_steps: u32, fixed_time_step: f32) -> u32 {
        if !dt.is_finite() || dt < 0.0 || fixed_time_step.is_nan() || fixed_time_step <= 0.0 {
            debug!("Ignoring step of {dt} s (fixed step {fixed_time_step} s)");
            return 0;
        }

        self.local_time += dt;
        let mut num_steps = 0u32;
        if self.local_time >= fixed_time_step {
            num_steps = (self.local_time / fixed_time_step) as u32;
            self.local_time -= num_steps as f32 * fixed_time_step;
        }

        if num_steps > 0 {
            let clamped = num_steps.min(max_sub_steps);
            if clamped < num_steps {
                debug!("Dropping {} simulation steps", num_steps - clamped);
            }

            let _timer = ScopedTimer::new("dynamics::step_simulation");
            self.events.clear();
            self.apply_gravity();
            for _ in 0..clamped {
                self.internal_single_step(fixed_time_step);
            }
            num_steps = clamped;
        }

        self.synchronize_motion_states();
        self.clear_forces();
        num_steps
    }

    /// Writes every non-static body's pose, extrapolated by the leftover time, to its motion state.
    pub fn synchronize_motion_states(&mut self) {
        let local_time = self.local_time;
        for (_, triad) in self.bodies.iter_mut() {
            let (body, motion_state, _) = triad.parts_mut();
            if body.is_static() {
                continue;
            }
            let transform = if body.is_active() {
                Integrator::predict(
                    &body.transform,
                    body.linear_velocity(),
                    body.angular_velocity(),
                    local_time,
                )
            } else {
                body.transform
            };
            motion_state.set_world_transform(transform);
        }
    }

    /// Closest body hit by the segment `from -> to`.
    pub fn ray_test(&self, from: Vec3, to: Vec3) -> Option<(BodyHandle, RayHit)> {
        let direction = to - from;
        let mut closest: Option<(BodyHandle, RayHit)> = None;

        for (handle, triad) in self.bodies.iter() {
            let transform = &triad.body().transform;
            let bounds = triad.shape().aabb(transform);
            let Some(entry) = bounds.ray_intersect(from, direction, 1.0) else {
                continue;
            };
            if closest.is_some_and(|(_, hit)| entry > hit.fraction) {
                continue;
            }
            if let Some(hit) = Raycast::test_shape(triad.shape(), transform, from, to) {
                if closest.map_or(true, |(_, best)| hit.fraction < best.fraction) {
                    closest = Some((handle, hit));
                }
            }
        }

        closest
    }

    fn apply_gravity(&mut self) {
        for (_, triad) in self.bodies.iter_mut() {
            let body = triad.body_mut();
            if body.is_active() {
                body.apply_gravity();
            }
        }
    }

    fn clear_forces(&mut self) {
        for (_, triad) in self.bodies.iter_mut() {
            triad.body_mut().clear_forces();
        }
    }

    fn internal_single_step(&mut self, dt: f32) {
        for (_, triad) in self.bodies.iter_mut() {
            self.integrator.integrate_velocity(triad.body_mut(), dt);
        }

        let mut manifolds = {
            let _timer = ScopedTimer::new("dynamics::collide");
            self.collide()
        };

        for manifold in &manifolds {
            if let Some(event) = CollisionEvent::from_manifold(manifold) {
                self.events
                    .retain(|old| !(old.body_a == event.body_a && old.body_b == event.body_b));
                self.events.push(event);
            }
        }
        self.wake_touched(&manifolds);

        {
            let _timer = ScopedTimer::new("dynamics::solve");
            self.solver.solve(&mut self.bodies, &mut manifolds, dt);
        }

        let config = &self.configuration;
        for (handle, triad) in self.bodies.iter_mut() {
            let body = triad.body_mut();
            self.integrator.integrate_position(body, dt);
            if body.update_deactivation(
                dt,
                config.sleep_linear_threshold,
                config.sleep_angular_threshold,
                config.time_to_sleep,
            ) {
                debug!("Body {:?} went to sleep", handle.id());
            }
        }
    }

    fn collide(&mut self) -> Vec<ContactManifold> {
        let proxies: Vec<BroadPhaseProxy> = self
            .bodies
            .iter()
            .map(|(handle, triad)| {
                let body = triad.body();
                BroadPhaseProxy {
                    body: handle,
                    bounds: triad.shape().aabb(&body.transform),
                    passive: body.is_static() || !body.is_active(),
                }
            })
            .collect();

        let mut manifolds = Vec::new();
        for (a, b) in self.broadphase.find_pairs(&proxies) {
            let (Some(triad_a), Some(triad_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
                continue;
            };
            let contacts = self.dispatcher.collide(
                triad_a.shape(),
                &triad_a.body().transform,
                triad_b.shape(),
                &triad_b.body().transform,
            );
            if contacts.is_empty() {
                continue;
            }
            manifolds.push(ContactManifold {
                body_a: a,
                body_b: b,
                contacts,
                responding: triad_a.body().has_contact_response()
                    && triad_b.body().has_contact_response(),
            });
        }
        manifolds
    }

    /// A moving body wakes any sleeping body it touches.
    fn wake_touched(&mut self, manifolds: &[ContactManifold]) {
        let linear = self.configuration.sleep_linear_threshold;
        let angular = self.configuration.sleep_angular_threshold;
        let moving = |triad: &RigidBodyTriad| {
            let body = triad.body();
            body.is_dynamic()
                && body.is_active()
                && (body.linear_velocity().length() > linear
                    || body.angular_velocity().length() > angular)
        };

        for manifold in manifolds {
            let (Some(a), Some(b)) = (
                self.bodies.get(manifold.body_a),
                self.bodies.get(manifold.body_b),
            ) else {
                continue;
            };
            let wake = match (moving(a), moving(b)) {
                (true, false) => Some(manifold.body_b),
                (false, true) => Some(manifold.body_a),
                _ => None,
            };
            if let Some(triad) = wake.and_then(|handle| self.bodies.get_mut(handle)) {
                let body = triad.body_mut();
                if body.is_dynamic() && !body.is_active() {
                    body.activate();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        rigidbody::{ActivationState, CollisionFlags},
        shape::CollisionShape,
        types::Transform,
    };
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn boxed(half: Vec3, mass: f32, position: Vec3) -> RigidBodyTriad {
        RigidBodyTriad::from_shape(
            CollisionShape::Box { half_extents: half },
            mass,
            Transform::from_position(position),
            true,
        )
    }

    fn ground(world: &mut DynamicsWorld) -> BodyHandle {
        world.add_rigid_body(boxed(Vec3::new(10.0, 0.5, 10.0), 0.0, Vec3::ZERO))
    }

    #[test]
    fn accumulator_runs_whole_steps_and_keeps_remainder() {
        let mut world = DynamicsWorld::default();
        assert_eq!(world.step_simulation(DT * 2.5, 10, DT), 2);
        assert_relative_eq!(world.local_time(), DT * 0.5, epsilon = 1e-5);
        assert_eq!(world.step_simulation(DT * 0.6, 10, DT), 1);
    }

    #[test]
    fn steps_beyond_limit_are_dropped() {
        let mut world = DynamicsWorld::default();
        assert_eq!(world.step_simulation(1.0, 10, DT), 10);
        assert!(world.local_time() < DT);
    }

    #[test]
    fn static_body_is_never_moved() {
        let mut world = DynamicsWorld::default();
        let handle = ground(&mut world);
        for _ in 0..30 {
            world.step_simulation(DT, 10, DT);
        }
        let triad = world.body(handle).unwrap();
        assert_eq!(triad.body().transform.position, Vec3::ZERO);
        assert_eq!(triad.motion_state().world_transform().position, Vec3::ZERO);
    }

    #[test]
    fn falling_box_comes_to_rest_on_ground() {
        let mut world = DynamicsWorld::default();
        ground(&mut world);
        let cube = world.add_rigid_body(boxed(Vec3::splat(0.5), 1.0, Vec3::new(0.0, 3.0, 0.0)));

        for _ in 0..180 {
            world.step_simulation(DT, 10, DT);
        }

        let body = world.body(cube).unwrap().body();
        assert!(
            (0.9..1.1).contains(&body.transform.position.y),
            "box at {:?}",
            body.transform.position
        );
        assert!(body.linear_velocity().length() < 0.5);
    }

    #[test]
    fn world_gravity_skips_flagged_bodies() {
        let mut world = DynamicsWorld::default();
        let mut character = boxed(Vec3::splat(0.5), 70.0, Vec3::ZERO);
        character.body_mut().set_body_flags(BodyFlags::DISABLE_WORLD_GRAVITY);
        let character = world.add_rigid_body(character);
        let falling = world.add_rigid_body(boxed(Vec3::splat(0.5), 1.0, Vec3::X * 5.0));

        world.set_gravity(Vec3::new(0.0, -20.0, 0.0));

        assert_eq!(world.body(character).unwrap().body().gravity(), Vec3::ZERO);
        assert_eq!(world.body(falling).unwrap().body().gravity(), Vec3::new(0.0, -20.0, 0.0));
    }

    #[test]
    fn trigger_overlap_is_reported_but_not_resolved() {
        let mut world = DynamicsWorld::default();
        world.set_gravity(Vec3::ZERO);
        let mut trigger = boxed(Vec3::splat(2.0), 0.0, Vec3::ZERO);
        trigger
            .body_mut()
            .set_collision_flags(CollisionFlags::STATIC_OBJECT | CollisionFlags::NO_CONTACT_RESPONSE);
        let trigger = world.add_rigid_body(trigger);

        let mut mover = boxed(Vec3::splat(0.5), 1.0, Vec3::new(0.0, 0.0, 0.0));
        mover.body_mut().set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));
        let mover = world.add_rigid_body(mover);

        world.step_simulation(DT, 10, DT);

        let velocity = world.body(mover).unwrap().body().linear_velocity();
        assert_relative_eq!(velocity.x, 1.0, epsilon = 1e-6);
        let event = world.collision_events().first().copied().unwrap();
        assert!(event.trigger);
        assert!(event.involves(trigger) && event.involves(mover));
    }

    #[test]
    fn ray_test_returns_closest_body() {
        let mut world = DynamicsWorld::default();
        let near = world.add_rigid_body(boxed(Vec3::ONE, 0.0, Vec3::new(0.0, 0.0, -5.0)));
        world.add_rigid_body(boxed(Vec3::ONE, 0.0, Vec3::new(0.0, 0.0, -10.0)));

        let (handle, hit) = world.ray_test(Vec3::ZERO, Vec3::new(0.0, 0.0, -20.0)).unwrap();
        assert_eq!(handle, near);
        assert_relative_eq!(hit.point.z, -4.0, epsilon = 1e-5);
        assert!(world.ray_test(Vec3::Y * 5.0, Vec3::new(0.0, 5.0, -20.0)).is_none());
    }

    #[test]
    fn resting_body_falls_asleep_unless_disabled() {
        let mut world = DynamicsWorld::default();
        world.set_gravity(Vec3::ZERO);
        let sleeper = world.add_rigid_body(boxed(Vec3::splat(0.5), 1.0, Vec3::ZERO));
        let mut awake = boxed(Vec3::splat(0.5), 1.0, Vec3::X * 10.0);
        awake
            .body_mut()
            .set_activation_state(ActivationState::DisableDeactivation);
        let awake = world.add_rigid_body(awake);

        for _ in 0..150 {
            world.step_simulation(DT, 10, DT);
        }

        assert_eq!(
            world.body(sleeper).unwrap().body().activation_state(),
            ActivationState::Sleeping
        );
        assert_eq!(
            world.body(awake).unwrap().body().activation_state(),
            ActivationState::DisableDeactivation
        );
    }

    #[test]
    fn removed_body_is_gone() {
        let mut world = DynamicsWorld::default();
        let handle = world.add_rigid_body(boxed(Vec3::ONE, 1.0, Vec3::ZERO));
        assert!(world.remove_rigid_body(handle).is_some());
        assert!(!world.contains(handle));
        assert!(world.remove_rigid_body(handle).is_none());
        assert_eq!(world.num_bodies(), 0);
    }

    #[test]
    fn non_finite_dt_is_ignored() {
        let mut world = DynamicsWorld::default();
        let ball = world.add_rigid_body(RigidBodyTriad::from_shape(
            CollisionShape::Sphere { radius: 0.5 },
            1.0,
            Transform::from_position(Vec3::new(0.0, 10.0, 0.0)),
            true,
        ));

        assert_eq!(world.step_simulation(f32::NAN, 10, DT), 0);
        assert_eq!(world.step_simulation(f32::INFINITY, 10, DT), 0);
        assert_eq!(world.step_simulation(-DT, 10, DT), 0);
        assert!(world.local_time().is_finite());

        assert_eq!(world.step_simulation(DT, 10, DT), 1);
        assert_eq!(world.step_simulation(DT, 10, DT), 1);
        let triad = world.body(ball).unwrap();
        let y = triad.body().transform.position.y;
        assert!(y.is_finite() && y < 10.0, "ball at y = {y}");
        assert!(triad.motion_state().world_transform().position.is_finite());
    }
}
