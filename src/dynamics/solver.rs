use glam::Vec3;

use crate::{
    collision::contact::ContactManifold,
    config::{
        DEFAULT_ALLOWED_PENETRATION, DEFAULT_BAUMGARTE, DEFAULT_RESTITUTION_THRESHOLD,
        DEFAULT_SOLVER_ITERATIONS,
    },
    core::rigidbody::{RigidBody, RigidBodyTriad},
    utils::allocator::Arena,
};

/// Per-contact data prepared once per step.
#[derive(Debug, Clone, Copy)]
struct ContactConstraint {
    manifold: usize,
    contact: usize,
    ra: Vec3,
    rb: Vec3,
    normal: Vec3,
    tangents: [Vec3; 2],
    normal_mass: f32,
    tangent_mass: [f32; 2],
    bias: f32,
    friction: f32,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SolverStepMetrics {
    pub manifolds_solved: usize,
    pub contacts_solved: usize,
    pub normal_impulse_sum: f32,
}

/// Projected Gauss-Seidel contact solver with accumulated impulse clamping.
#[derive(Debug, Clone)]
pub struct SequentialImpulseSolver {
    pub iterations: u32,
    /// Fraction of the penetration fed back as velocity each step.
    pub baumgarte: f32,
    pub allowed_penetration: f32,
    pub restitution_threshold: f32,
}

impl Default for SequentialImpulseSolver {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SOLVER_ITERATIONS,
            baumgarte: DEFAULT_BAUMGARTE,
            allowed_penetration: DEFAULT_ALLOWED_PENETRATION,
            restitution_threshold: DEFAULT_RESTITUTION_THRESHOLD,
        }
    }
}

impl SequentialImpulseSolver {
    /// Resolves every responding manifold. Pairs without contact response are ignored.
    pub fn solve(
        &self,
        bodies: &mut Arena<RigidBodyTriad>,
        manifolds: &mut [ContactManifold],
        dt: f32,
    ) -> SolverStepMetrics {
        let mut metrics = SolverStepMetrics::default();
        if dt <= 0.0 {
            return metrics;
        }

        let constraints = self.prepare(bodies, manifolds, dt, &mut metrics);

        for _ in 0..self.iterations {
            for constraint in &constraints {
                let manifold = &mut manifolds[constraint.manifold];
                let Some((triad_a, triad_b)) = bodies.get2_mut(manifold.body_a, manifold.body_b)
                else {
                    continue;
                };
                let contact = &mut manifold.contacts[constraint.contact];
                let (body_a, body_b) = (triad_a.body_mut(), triad_b.body_mut());

                let relative =
                    body_b.velocity_at(constraint.rb) - body_a.velocity_at(constraint.ra);
                let vn = relative.dot(constraint.normal);
                let lambda = (constraint.bias - vn) * constraint.normal_mass;
                let accumulated = (contact.accumulated_normal_impulse + lambda).max(0.0);
                let lambda = accumulated - contact.accumulated_normal_impulse;
                contact.accumulated_normal_impulse = accumulated;
                Self::apply_pair(body_a, body_b, constraint, constraint.normal * lambda);

                let max_friction = constraint.friction * contact.accumulated_normal_impulse;
                for axis in 0..2 {
                    let tangent = constraint.tangents[axis];
                    let relative =
                        body_b.velocity_at(constraint.rb) - body_a.velocity_at(constraint.ra);
                    let lambda = -relative.dot(tangent) * constraint.tangent_mass[axis];
                    let accumulated = (contact.accumulated_tangent_impulse[axis] + lambda)
                        .clamp(-max_friction, max_friction);
                    let lambda = accumulated - contact.accumulated_tangent_impulse[axis];
                    contact.accumulated_tangent_impulse[axis] = accumulated;
                    Self::apply_pair(body_a, body_b, constraint, tangent * lambda);
                }
            }
        }

        metrics.normal_impulse_sum = manifolds
            .iter()
            .flat_map(|m| m.contacts.iter())
            .map(|c| c.accumulated_normal_impulse)
            .sum();
        metrics
    }

    fn prepare(
        &self,
        bodies: &Arena<RigidBodyTriad>,
        manifolds: &[ContactManifold],
        dt: f32,
        metrics: &mut SolverStepMetrics,
    ) -> Vec<ContactConstraint> {
        let mut constraints = Vec::new();

        for (manifold_index, manifold) in manifolds.iter().enumerate() {
            if !manifold.responding {
                continue;
            }
            let (Some(triad_a), Some(triad_b)) =
                (bodies.get(manifold.body_a), bodies.get(manifold.body_b))
            else {
                continue;
            };
            let (body_a, body_b) = (triad_a.body(), triad_b.body());
            if body_a.is_static() && body_b.is_static() {
                continue;
            }
            metrics.manifolds_solved += 1;

            let friction = body_a.friction * body_b.friction;
            let restitution = body_a.restitution * body_b.restitution;

            for (contact_index, contact) in manifold.contacts.iter().enumerate() {
                let normal = contact.normal;
                let ra = contact.point - body_a.transform.position;
                let rb = contact.point - body_b.transform.position;

                let k = Self::inverse_mass_along(body_a, ra, normal)
                    + Self::inverse_mass_along(body_b, rb, normal);
                if k <= f32::EPSILON {
                    continue;
                }

                let tangent_a = any_orthonormal(normal);
                let tangents = [tangent_a, normal.cross(tangent_a)];
                let tangent_mass = tangents.map(|t| {
                    let kt = Self::inverse_mass_along(body_a, ra, t)
                        + Self::inverse_mass_along(body_b, rb, t);
                    if kt > f32::EPSILON {
                        1.0 / kt
                    } else {
                        0.0
                    }
                });

                let vn = (body_b.velocity_at(rb) - body_a.velocity_at(ra)).dot(normal);
                let bounce = if -vn > self.restitution_threshold {
                    -restitution * vn
                } else {
                    0.0
                };
                let correction = self.baumgarte / dt
                    * (contact.depth - self.allowed_penetration).max(0.0);

                constraints.push(ContactConstraint {
                    manifold: manifold_index,
                    contact: contact_index,
                    ra,
                    rb,
                    normal,
                    tangents,
                    normal_mass: 1.0 / k,
                    tangent_mass,
                    bias: bounce.max(correction),
                    friction,
                });
                metrics.contacts_solved += 1;
            }
        }

        constraints
    }

    /// Impulse acts on B, its opposite on A.
    fn apply_pair(
        body_a: &mut RigidBody,
        body_b: &mut RigidBody,
        constraint: &ContactConstraint,
        impulse: Vec3,
    ) {
        body_a.apply_impulse(-impulse, constraint.ra);
        body_b.apply_impulse(impulse, constraint.rb);
    }

    fn inverse_mass_along(body: &RigidBody, r: Vec3, direction: Vec3) -> f32 {
        if body.is_static() {
            return 0.0;
        }
        let linear = body.inverse_mass() * (direction * body.linear_factor).dot(direction);
        let angular = ((body.inverse_inertia_world() * r.cross(direction)) * body.angular_factor)
            .cross(r)
            .dot(direction);
        linear + angular
    }
}

fn any_orthonormal(normal: Vec3) -> Vec3 {
    let axis = if normal.x.abs() < 0.57 { Vec3::X } else { Vec3::Y };
    normal.cross(axis).normalize_or_zero()
}
