use glam::Vec3;

use crate::core::{shape::CollisionShape, types::Transform};

/// Ray hit against a single shape. `fraction` is the position along the
/// `from -> to` segment, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub fraction: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Segment ray tests against collision shapes.
///
/// Rays that start inside a convex shape do not hit it.
pub struct Raycast;

impl Raycast {
    pub fn test_shape(
        shape: &CollisionShape,
        transform: &Transform,
        from: Vec3,
        to: Vec3,
    ) -> Option<RayHit> {
        let origin = transform.inverse_transform_point(from);
        let direction = transform.inverse_transform_vector(to - from);
        if direction.length_squared() < 1e-12 {
            return None;
        }

        let (fraction, local_normal) = match shape {
            CollisionShape::Box { half_extents } => Self::ray_box(origin, direction, *half_extents)?,
            CollisionShape::Sphere { radius } => Self::ray_sphere(origin, direction, Vec3::ZERO, *radius)?,
            CollisionShape::Capsule { radius, height } => {
                Self::ray_capsule(origin, direction, *radius, height * 0.5)?
            }
            CollisionShape::Cylinder { half_extents } => {
                Self::ray_cylinder(origin, direction, half_extents.x, half_extents.y)?
            }
            CollisionShape::TriangleMesh(mesh) => {
                let hit = mesh.raycast(origin, direction, 1.0)?;
                (hit.t, hit.normal)
            }
            // TODO: support hull raycasts once convex colliders are populated from mesh points.
            CollisionShape::ConvexHull { .. } => return None,
        };

        Some(RayHit {
            fraction,
            point: from + (to - from) * fraction,
            normal: transform.transform_vector(local_normal).normalize_or_zero(),
        })
    }

    /// Slab test against a centered box.
    pub fn ray_box(origin: Vec3, direction: Vec3, half_extents: Vec3) -> Option<(f32, Vec3)> {
        if origin.abs().cmple(half_extents).all() {
            return None;
        }

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let h = half_extents[axis];
            if d.abs() < 1e-12 {
                if o < -h || o > h {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (-h - o) * inv;
            let mut t2 = (h - o) * inv;
            let mut sign = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                sign = 1.0;
            }
            if t1 > t_enter {
                t_enter = t1;
                normal = Vec3::ZERO;
                normal[axis] = sign;
            }
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }

        (0.0..=1.0).contains(&t_enter).then_some((t_enter, normal))
    }

    pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
        let m = origin - center;
        let c = m.length_squared() - radius * radius;
        if c <= 0.0 {
            return None;
        }
        let a = direction.length_squared();
        let b = m.dot(direction);
        if b > 0.0 {
            return None;
        }
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let t = (-b - discriminant.sqrt()) / a;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        let point = origin + direction * t;
        Some((t, (point - center) / radius))
    }

    /// Capsule along Y with cap centers at `±half_height`.
    pub fn ray_capsule(
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        half_height: f32,
    ) -> Option<(f32, Vec3)> {
        let axis_point = Vec3::new(0.0, origin.y.clamp(-half_height, half_height), 0.0);
        if origin.distance_squared(axis_point) <= radius * radius {
            return None;
        }

        let mut best = Self::ray_side(origin, direction, radius, half_height);
        for cap in [half_height, -half_height] {
            if let Some(hit) = Self::ray_sphere(origin, direction, Vec3::new(0.0, cap, 0.0), radius) {
                if best.map_or(true, |b| hit.0 < b.0) {
                    best = Some(hit);
                }
            }
        }
        best
    }

    /// Cylinder along Y with flat caps at `±half_height`.
    pub fn ray_cylinder(
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        half_height: f32,
    ) -> Option<(f32, Vec3)> {
        let radial = Vec3::new(origin.x, 0.0, origin.z);
        if origin.y.abs() <= half_height && radial.length_squared() <= radius * radius {
            return None;
        }

        let mut best = Self::ray_side(origin, direction, radius, half_height);
        if direction.y.abs() > 1e-12 {
            for (cap, normal) in [(half_height, Vec3::Y), (-half_height, Vec3::NEG_Y)] {
                let t = (cap - origin.y) / direction.y;
                if !(0.0..=1.0).contains(&t) || direction.dot(normal) >= 0.0 {
                    continue;
                }
                let p = origin + direction * t;
                if p.x * p.x + p.z * p.z <= radius * radius && best.map_or(true, |b| t < b.0) {
                    best = Some((t, normal));
                }
            }
        }
        best
    }

    /// Entry into the infinite Y-aligned tube, limited to `|y| <= half_height`.
    fn ray_side(origin: Vec3, direction: Vec3, radius: f32, half_height: f32) -> Option<(f32, Vec3)> {
        let a = direction.x * direction.x + direction.z * direction.z;
        if a < 1e-12 {
            return None;
        }
        let b = origin.x * direction.x + origin.z * direction.z;
        let c = origin.x * origin.x + origin.z * origin.z - radius * radius;
        let discriminant = b * b - a * c;
        if c <= 0.0 || discriminant < 0.0 {
            return None;
        }
        let t = (-b - discriminant.sqrt()) / a;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        let point = origin + direction * t;
        if point.y.abs() > half_height {
            return None;
        }
        Some((t, Vec3::new(point.x, 0.0, point.z) / radius))
    }
}
